use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::{
    errors::{ApiError, ExamError},
    routes::{
        exams::{AnswerSheet, ExamOutput, SubmissionOutput},
        extract::{AppJson, AppPath, CurrentUser},
    },
    services::database::{ExamDefinition, ExamScope, GuestInfo, Submission, Submitter},
    setup::AppState,
    utils::envelope::{data, ok, Envelope},
};

#[derive(Debug, Deserialize)]
pub struct CreatePayload {
    #[serde(default)]
    subject: Option<String>,
    #[serde(flatten)]
    definition: ExamDefinition,
}

#[derive(Debug, Deserialize)]
pub struct GuestSubmissionPayload {
    student_info: GuestInfo,
    #[serde(flatten)]
    sheet: AnswerSheet,
}

#[derive(Debug, Serialize)]
pub struct SubmissionsOutput {
    submissions: Vec<Submission>,
}

#[axum::debug_handler(state = AppState)]
pub async fn create_public_exam(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(payload): AppJson<CreatePayload>,
) -> Result<(StatusCode, Json<Envelope<ExamOutput>>), ApiError<ExamError>> {
    // 1. Validate payload input
    payload.definition.validate()?;
    debug!("public exam payload validated");

    // 2. Create the exam outside of any course
    let subject = payload
        .subject
        .map(|subject| subject.trim().to_string())
        .filter(|subject| !subject.is_empty());
    let exam = state
        .exams()
        .create(
            &current.user.id,
            ExamScope::Public { subject },
            payload.definition,
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        ok("Public exam created successfully", ExamOutput { exam }),
    ))
}

pub async fn get_public_exam(
    State(state): State<AppState>,
    AppPath(exam_id): AppPath<String>,
) -> Result<Json<Envelope<ExamOutput>>, ApiError<ExamError>> {
    let exam = state.exams().get_public(&exam_id).await?;

    Ok(data(ExamOutput { exam }))
}

#[axum::debug_handler(state = AppState)]
pub async fn submit_public_exam(
    State(state): State<AppState>,
    AppPath(exam_id): AppPath<String>,
    AppJson(payload): AppJson<GuestSubmissionPayload>,
) -> Result<(StatusCode, Json<Envelope<SubmissionOutput>>), ApiError<ExamError>> {
    // 1. Validate payload input
    payload.student_info.validate()?;
    payload.sheet.validate()?;

    // 2. Record the submission once per guest identity
    let submission = state
        .exams()
        .submit(
            &exam_id,
            Submitter::Guest(payload.student_info),
            payload.sheet.into(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        ok("Exam submitted successfully", SubmissionOutput { submission }),
    ))
}

pub async fn public_exam_submissions(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(exam_id): AppPath<String>,
) -> Result<Json<Envelope<SubmissionsOutput>>, ApiError<ExamError>> {
    let submissions = state
        .exams()
        .guest_submissions(&exam_id, &current.user.id)
        .await?;

    Ok(data(SubmissionsOutput { submissions }))
}

pub fn public_exams_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_public_exam))
        .route("/:exam_id", get(get_public_exam))
        .route("/:exam_id/submit", post(submit_public_exam))
        .route("/:exam_id/submissions", get(public_exam_submissions))
}
