use std::fmt::Display;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use hyper::StatusCode;
use serde_json::{json, Value};
use tracing::error;

use super::common::CommonError;

pub trait ErrorResponse {
    fn error_name(&self) -> &str;
    fn error_message(&self) -> Value;
    fn status_code(&self) -> StatusCode;
}

pub struct ApiError<T>(pub T);

impl<T: ErrorResponse + Display> IntoResponse for ApiError<T> {
    fn into_response(self) -> Response {
        let status = self.0.status_code();

        // Internal detail stays in the logs; the body only carries the generic message.
        if status.is_server_error() {
            error!(error = %self.0, kind = self.0.error_name(), "request failed");
        }

        let body = Json(json!({
            "success": false,
            "error": self.0.error_name(),
            "message": self.0.error_message()
        }));
        (status, body).into_response()
    }
}

impl ErrorResponse for CommonError {
    fn error_name(&self) -> &str {
        match self {
            CommonError::Validation(_) => "Validation Error",
            CommonError::MalformedBody(_) => "Malformed Request Body",
            CommonError::MalformedPath(_) => "Malformed Path",
            CommonError::Database(_) => "Database Error",
            CommonError::Hashing(_) => "Hashing Error",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            CommonError::Validation(errors) => {
                let mut field_errors = serde_json::Map::new();
                for (field, error_vec) in errors.field_errors() {
                    let messages: Vec<String> = error_vec
                        .iter()
                        .map(|error| match &error.message {
                            Some(message) => message.to_string(),
                            None => error.code.to_string(),
                        })
                        .collect();
                    if !messages.is_empty() {
                        field_errors.insert(field.to_string(), json!(messages));
                    }
                }
                json!(field_errors)
            }
            CommonError::MalformedBody(rejection) => json!(rejection.body_text()),
            CommonError::MalformedPath(rejection) => json!(rejection.body_text()),
            CommonError::Database(_) => {
                json!("A storage error occurred, please try again")
            }
            CommonError::Hashing(_) => json!("An error occurred while processing credentials"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            CommonError::Validation(_) => StatusCode::BAD_REQUEST,
            CommonError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            CommonError::MalformedPath(_) => StatusCode::BAD_REQUEST,
            CommonError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CommonError::Hashing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
