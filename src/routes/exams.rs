use axum::{
    extract::State,
    routing::{get, post, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::{
    errors::{ApiError, ExamError},
    routes::extract::{AppJson, AppPath, CurrentUser},
    services::{
        database::{Exam, ExamDefinition, ExamScope, Submission, SubmissionType, Submitter},
        exams::{AvailableExam, ResultView, ReviewInput, SubmissionInput},
    },
    setup::AppState,
    utils::envelope::{data, ok, ok_message, Envelope, NoPayload},
};

/// What a submitter hands in. Shared by registered and guest submissions.
#[derive(Debug, Deserialize, Validate)]
pub struct AnswerSheet {
    #[validate(range(min = 0.0, message = "The score must not be negative"))]
    pub score: f64,
    #[validate(range(min = 0.0, message = "Total marks must not be negative"))]
    pub total_marks: f64,
    #[serde(default)]
    pub answers: serde_json::Value,
    #[serde(default)]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl From<AnswerSheet> for SubmissionInput {
    fn from(sheet: AnswerSheet) -> Self {
        SubmissionInput {
            score: sheet.score,
            total_marks: sheet.total_marks,
            answers: sheet.answers,
            submitted_at: sheet.submitted_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ReviewPayload {
    #[validate(length(min = 1, message = "The submission id is required"))]
    submission_id: String,
    submission_type: SubmissionType,
    student_id: Option<String>,
    #[validate(range(min = 0.0, message = "The score must not be negative"))]
    score: f64,
    #[serde(default)]
    answers: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct ExamOutput {
    pub exam: Exam,
}

#[derive(Debug, Serialize)]
pub struct ExamsOutput {
    exams: Vec<Exam>,
}

#[derive(Debug, Serialize)]
pub struct AvailableOutput {
    exams: Vec<AvailableExam>,
}

#[derive(Debug, Serialize)]
pub struct SubmissionOutput {
    pub submission: Submission,
}

#[derive(Debug, Serialize)]
pub struct ResultsOutput {
    results: Vec<ResultView>,
}

#[derive(Debug, Serialize)]
pub struct StudentResultsOutput {
    results: Vec<Submission>,
}

#[axum::debug_handler(state = AppState)]
pub async fn create_course_exam(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(course_id): AppPath<String>,
    AppJson(payload): AppJson<ExamDefinition>,
) -> Result<(StatusCode, Json<Envelope<ExamOutput>>), ApiError<ExamError>> {
    // 1. Validate payload input
    payload.validate()?;
    debug!(%course_id, "course exam payload validated");

    // 2. Create the exam under the caller's course
    let exam = state
        .exams()
        .create(&current.user.id, ExamScope::Course { course_id }, payload)
        .await?;

    Ok((
        StatusCode::CREATED,
        ok("Exam created successfully", ExamOutput { exam }),
    ))
}

pub async fn list_course_exams(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(course_id): AppPath<String>,
) -> Result<Json<Envelope<ExamsOutput>>, ApiError<ExamError>> {
    let exams = state
        .exams()
        .course_exams(&course_id, &current.user)
        .await?;

    Ok(data(ExamsOutput { exams }))
}

pub async fn student_results(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath((course_id, student_id)): AppPath<(String, String)>,
) -> Result<Json<Envelope<StudentResultsOutput>>, ApiError<ExamError>> {
    let results = state
        .exams()
        .student_results(&course_id, &student_id, &current.user)
        .await?;

    Ok(data(StudentResultsOutput { results }))
}

pub async fn available_exams(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Envelope<AvailableOutput>>, ApiError<ExamError>> {
    let exams = state.exams().available_for(&current.user.id).await?;

    Ok(data(AvailableOutput { exams }))
}

pub async fn get_exam(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(exam_id): AppPath<String>,
) -> Result<Json<Envelope<ExamOutput>>, ApiError<ExamError>> {
    let exam = state.exams().get(&exam_id, &current.user).await?;

    Ok(data(ExamOutput { exam }))
}

pub async fn delete_exam(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(exam_id): AppPath<String>,
) -> Result<Json<Envelope<NoPayload>>, ApiError<ExamError>> {
    state.exams().delete(&exam_id, &current.user.id).await?;

    Ok(ok_message("Exam deleted successfully"))
}

#[axum::debug_handler(state = AppState)]
pub async fn submit_exam(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(exam_id): AppPath<String>,
    AppJson(payload): AppJson<AnswerSheet>,
) -> Result<(StatusCode, Json<Envelope<SubmissionOutput>>), ApiError<ExamError>> {
    // 1. Validate payload input
    payload.validate()?;

    // 2. Record the submission once per student
    let submitter = Submitter::Registered {
        student_id: current.user.id,
    };
    let submission = state
        .exams()
        .submit(&exam_id, submitter, payload.into())
        .await?;

    Ok((
        StatusCode::CREATED,
        ok("Exam submitted successfully", SubmissionOutput { submission }),
    ))
}

pub async fn exam_results(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(exam_id): AppPath<String>,
) -> Result<Json<Envelope<ResultsOutput>>, ApiError<ExamError>> {
    let results = state
        .exams()
        .all_results(&exam_id, &current.user.id)
        .await?;

    Ok(data(ResultsOutput { results }))
}

#[axum::debug_handler(state = AppState)]
pub async fn review_submission(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(exam_id): AppPath<String>,
    AppJson(payload): AppJson<ReviewPayload>,
) -> Result<Json<Envelope<SubmissionOutput>>, ApiError<ExamError>> {
    payload.validate()?;

    let submission = state
        .exams()
        .review(
            &exam_id,
            &current.user.id,
            ReviewInput {
                submission_id: payload.submission_id,
                submission_type: payload.submission_type,
                student_id: payload.student_id,
                score: payload.score,
                answers: payload.answers,
            },
        )
        .await?;

    Ok(ok("Submission reviewed successfully", SubmissionOutput { submission }))
}

pub async fn duplicate_exam(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(exam_id): AppPath<String>,
) -> Result<(StatusCode, Json<Envelope<ExamOutput>>), ApiError<ExamError>> {
    let exam = state
        .exams()
        .duplicate(&exam_id, &current.user.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        ok("Exam duplicated successfully", ExamOutput { exam }),
    ))
}

pub fn exams_router() -> Router<AppState> {
    Router::new()
        .route("/available", get(available_exams))
        .route("/:exam_id", get(get_exam).delete(delete_exam))
        .route("/:exam_id/submit", post(submit_exam))
        .route("/:exam_id/results", get(exam_results))
        .route("/:exam_id/review", put(review_submission))
        .route("/:exam_id/duplicate", post(duplicate_exam))
}
