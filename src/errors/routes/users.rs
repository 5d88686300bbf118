use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::{
    common_error_conversions,
    errors::{CommonError, ErrorResponse},
};

#[derive(Debug, Display)]
pub enum UserError {
    Common(CommonError),
    UserNotFound,
}

impl ErrorResponse for UserError {
    fn error_name(&self) -> &str {
        match self {
            UserError::Common(e) => e.error_name(),
            UserError::UserNotFound => "User Not Found",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            UserError::Common(e) => e.error_message(),
            UserError::UserNotFound => json!("The requested user does not exist"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            UserError::Common(e) => e.status_code(),
            UserError::UserNotFound => StatusCode::NOT_FOUND,
        }
    }
}

common_error_conversions!(UserError);
