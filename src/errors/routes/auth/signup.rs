use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::{
    common_error_conversions,
    errors::{CommonError, ErrorResponse},
};

#[derive(Debug, Display)]
pub enum SignupError {
    Common(CommonError),
    EmailAlreadyExists,
}

impl ErrorResponse for SignupError {
    fn error_name(&self) -> &str {
        match self {
            SignupError::Common(e) => e.error_name(),
            SignupError::EmailAlreadyExists => "Email Already Exists",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            SignupError::Common(e) => e.error_message(),
            SignupError::EmailAlreadyExists => {
                json!("An account with this email already exists")
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            SignupError::Common(e) => e.status_code(),
            SignupError::EmailAlreadyExists => StatusCode::CONFLICT,
        }
    }
}

common_error_conversions!(SignupError);
