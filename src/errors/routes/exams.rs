use derive_more::Display;
use hyper::StatusCode;
use serde_json::{json, Value};

use crate::{
    common_error_conversions,
    errors::{CommonError, ErrorResponse},
};

#[derive(Debug, Display)]
pub enum ExamError {
    Common(CommonError),
    ExamNotFound,
    CourseNotFound,
    SubmissionNotFound,
    AlreadySubmitted,
    Forbidden,
}

impl ErrorResponse for ExamError {
    fn error_name(&self) -> &str {
        match self {
            ExamError::Common(e) => e.error_name(),
            ExamError::ExamNotFound => "Exam Not Found",
            ExamError::CourseNotFound => "Course Not Found",
            ExamError::SubmissionNotFound => "Submission Not Found",
            ExamError::AlreadySubmitted => "Already Submitted",
            ExamError::Forbidden => "Forbidden",
        }
    }

    fn error_message(&self) -> Value {
        match self {
            ExamError::Common(e) => e.error_message(),
            ExamError::ExamNotFound => json!("Exam not found or access denied"),
            ExamError::CourseNotFound => json!("Course not found or access denied"),
            ExamError::SubmissionNotFound => json!("Submission not found or access denied"),
            ExamError::AlreadySubmitted => json!("This exam has already been submitted"),
            ExamError::Forbidden => json!("You are not allowed to perform this action"),
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ExamError::Common(e) => e.status_code(),
            ExamError::ExamNotFound => StatusCode::NOT_FOUND,
            ExamError::CourseNotFound => StatusCode::NOT_FOUND,
            ExamError::SubmissionNotFound => StatusCode::NOT_FOUND,
            ExamError::AlreadySubmitted => StatusCode::CONFLICT,
            ExamError::Forbidden => StatusCode::FORBIDDEN,
        }
    }
}

common_error_conversions!(ExamError);
