use axum::extract::rejection::{JsonRejection, PathRejection};
use derive_more::Display;

use crate::{errors::ApiError, services::database::DatabaseError};

#[derive(Debug, Display)]
pub enum CommonError {
    Validation(validator::ValidationErrors),
    MalformedBody(JsonRejection),
    MalformedPath(PathRejection),
    Database(DatabaseError),
    Hashing(argon2::password_hash::Error),
}

/// Rejection of the body and path extractors, answered before any component runs.
pub type RequestError = ApiError<CommonError>;

impl From<JsonRejection> for RequestError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(CommonError::MalformedBody(rejection))
    }
}

impl From<PathRejection> for RequestError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(CommonError::MalformedPath(rejection))
    }
}

/// Wires a component error enum with a `Common(CommonError)` variant into `?`: from
/// store and hashing failures inside the components, and from validation failures and
/// the error itself inside route handlers.
#[macro_export]
macro_rules! common_error_conversions {
    ($error:ident) => {
        impl From<$crate::errors::CommonError> for $error {
            fn from(error: $crate::errors::CommonError) -> Self {
                $error::Common(error)
            }
        }

        impl From<$crate::services::database::DatabaseError> for $error {
            fn from(error: $crate::services::database::DatabaseError) -> Self {
                $error::Common($crate::errors::CommonError::Database(error))
            }
        }

        impl From<argon2::password_hash::Error> for $error {
            fn from(error: argon2::password_hash::Error) -> Self {
                $error::Common($crate::errors::CommonError::Hashing(error))
            }
        }

        impl From<$error> for $crate::errors::ApiError<$error> {
            fn from(error: $error) -> Self {
                $crate::errors::ApiError(error)
            }
        }

        // Automatic Error Conversion

        impl From<validator::ValidationErrors> for $crate::errors::ApiError<$error> {
            fn from(error: validator::ValidationErrors) -> Self {
                $crate::errors::ApiError($error::Common(
                    $crate::errors::CommonError::Validation(error),
                ))
            }
        }

        impl From<$crate::services::database::DatabaseError> for $crate::errors::ApiError<$error> {
            fn from(error: $crate::services::database::DatabaseError) -> Self {
                $crate::errors::ApiError($error::Common($crate::errors::CommonError::Database(
                    error,
                )))
            }
        }
    };
}
