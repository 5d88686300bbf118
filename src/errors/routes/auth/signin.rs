use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::{
    common_error_conversions,
    errors::{CommonError, ErrorResponse, SessionError},
};

#[derive(Debug, Display)]
pub enum SigninError {
    Common(CommonError),
    InvalidCredentials,
}

impl ErrorResponse for SigninError {
    fn error_name(&self) -> &str {
        match self {
            SigninError::Common(e) => e.error_name(),
            SigninError::InvalidCredentials => "Invalid Credentials",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            SigninError::Common(e) => e.error_message(),
            SigninError::InvalidCredentials => json!("The provided credentials are invalid"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            SigninError::Common(e) => e.status_code(),
            SigninError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        }
    }
}

// Signin creates a session right after verifying; only storage failures reach here.
impl From<SessionError> for SigninError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Common(error) => SigninError::Common(error),
            SessionError::MissingToken | SessionError::InvalidSession => {
                SigninError::InvalidCredentials
            }
        }
    }
}

common_error_conversions!(SigninError);
