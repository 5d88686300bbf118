use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::{
    common_error_conversions,
    errors::{CommonError, ErrorResponse},
};

#[derive(Debug, Display)]
pub enum SessionError {
    Common(CommonError),
    MissingToken,
    InvalidSession,
}

impl ErrorResponse for SessionError {
    fn error_name(&self) -> &str {
        match self {
            SessionError::Common(e) => e.error_name(),
            SessionError::MissingToken => "Missing Token",
            SessionError::InvalidSession => "Invalid Session",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            SessionError::Common(e) => e.error_message(),
            SessionError::MissingToken => json!("Authentication is required"),
            SessionError::InvalidSession => json!("The session is invalid or has expired"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            SessionError::Common(e) => e.status_code(),
            SessionError::MissingToken => StatusCode::UNAUTHORIZED,
            SessionError::InvalidSession => StatusCode::UNAUTHORIZED,
        }
    }
}

common_error_conversions!(SessionError);
