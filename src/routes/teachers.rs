use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use crate::{
    errors::{ApiError, ExamError, UserError},
    routes::extract::CurrentUser,
    services::{
        database::{Exam, Role, UserProfile},
        exams::PublicExamSummary,
    },
    setup::AppState,
    utils::envelope::{data, Envelope},
};

#[derive(Debug, Serialize)]
pub struct TeachersOutput {
    teachers: Vec<UserProfile>,
}

#[derive(Debug, Serialize)]
pub struct ExamsOutput {
    exams: Vec<Exam>,
}

#[derive(Debug, Serialize)]
pub struct PublicExamsOutput {
    exams: Vec<PublicExamSummary>,
}

pub async fn list_teachers(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> Result<Json<Envelope<TeachersOutput>>, ApiError<UserError>> {
    let teachers = state.credentials().list_by_role(Role::Teacher).await?;

    Ok(data(TeachersOutput { teachers }))
}

pub async fn my_exams(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Envelope<ExamsOutput>>, ApiError<ExamError>> {
    let exams = state.exams().owner_exams(&current.user.id).await?;

    Ok(data(ExamsOutput { exams }))
}

pub async fn my_public_exams(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Envelope<PublicExamsOutput>>, ApiError<ExamError>> {
    let exams = state.exams().owner_public_exams(&current.user.id).await?;

    Ok(data(PublicExamsOutput { exams }))
}

pub fn teachers_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_teachers))
        .route("/me/exams", get(my_exams))
        .route("/me/public-exams", get(my_public_exams))
}
