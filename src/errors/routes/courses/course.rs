use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::{
    common_error_conversions,
    errors::{CommonError, ErrorResponse},
};

#[derive(Debug, Display)]
pub enum CourseError {
    Common(CommonError),
    CourseNotFound,
    TeacherRequired,
}

impl ErrorResponse for CourseError {
    fn error_name(&self) -> &str {
        match self {
            CourseError::Common(e) => e.error_name(),
            CourseError::CourseNotFound => "Course Not Found",
            CourseError::TeacherRequired => "Teacher Required",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            CourseError::Common(e) => e.error_message(),
            CourseError::CourseNotFound => json!("Course not found or access denied"),
            CourseError::TeacherRequired => json!("Only teachers can manage courses"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            CourseError::Common(e) => e.status_code(),
            CourseError::CourseNotFound => StatusCode::NOT_FOUND,
            CourseError::TeacherRequired => StatusCode::FORBIDDEN,
        }
    }
}

common_error_conversions!(CourseError);
