use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::{
    common_error_conversions,
    errors::{CommonError, ErrorResponse},
};

#[derive(Debug, Display)]
pub enum PasswordResetError {
    Common(CommonError),
    UserNotFound,
    InvalidOrExpiredToken,
}

impl ErrorResponse for PasswordResetError {
    fn error_name(&self) -> &str {
        match self {
            PasswordResetError::Common(e) => e.error_name(),
            PasswordResetError::UserNotFound => "User Not Found",
            PasswordResetError::InvalidOrExpiredToken => "Invalid Or Expired Token",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            PasswordResetError::Common(e) => e.error_message(),
            PasswordResetError::UserNotFound => {
                json!("No active account exists for this email")
            }
            PasswordResetError::InvalidOrExpiredToken => {
                json!("The password reset token is invalid or has expired")
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            PasswordResetError::Common(e) => e.status_code(),
            PasswordResetError::UserNotFound => StatusCode::NOT_FOUND,
            PasswordResetError::InvalidOrExpiredToken => StatusCode::BAD_REQUEST,
        }
    }
}

common_error_conversions!(PasswordResetError);
