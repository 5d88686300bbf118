use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::{
    common_error_conversions,
    errors::{CommonError, ErrorResponse},
};

#[derive(Debug, Display)]
pub enum EnrollmentError {
    Common(CommonError),
    CourseNotFound,
    StudentNotFound,
    AlreadyEnrolled,
    EnrollmentNotFound,
}

impl ErrorResponse for EnrollmentError {
    fn error_name(&self) -> &str {
        match self {
            EnrollmentError::Common(e) => e.error_name(),
            EnrollmentError::CourseNotFound => "Course Not Found",
            EnrollmentError::StudentNotFound => "Student Not Found",
            EnrollmentError::AlreadyEnrolled => "Already Enrolled",
            EnrollmentError::EnrollmentNotFound => "Enrollment Not Found",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            EnrollmentError::Common(e) => e.error_message(),
            EnrollmentError::CourseNotFound => json!("Course not found or access denied"),
            EnrollmentError::StudentNotFound => json!("No student account matches this id"),
            EnrollmentError::AlreadyEnrolled => {
                json!("Student already enrolled in this course")
            }
            EnrollmentError::EnrollmentNotFound => {
                json!("The student is not enrolled in this course")
            }
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            EnrollmentError::Common(e) => e.status_code(),
            EnrollmentError::CourseNotFound => StatusCode::NOT_FOUND,
            EnrollmentError::StudentNotFound => StatusCode::NOT_FOUND,
            EnrollmentError::AlreadyEnrolled => StatusCode::CONFLICT,
            EnrollmentError::EnrollmentNotFound => StatusCode::NOT_FOUND,
        }
    }
}

common_error_conversions!(EnrollmentError);
