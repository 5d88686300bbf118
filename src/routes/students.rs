use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ApiError, EnrollmentError, UserError},
    routes::extract::CurrentUser,
    services::{
        database::{Role, UserProfile},
        enrollment::EnrolledCourse,
    },
    setup::AppState,
    utils::envelope::{data, Envelope},
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Serialize)]
pub struct StudentsOutput {
    students: Vec<UserProfile>,
}

#[derive(Debug, Serialize)]
pub struct CoursesOutput {
    courses: Vec<EnrolledCourse>,
}

pub async fn list_students(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> Result<Json<Envelope<StudentsOutput>>, ApiError<UserError>> {
    let students = state.credentials().list_by_role(Role::Student).await?;

    Ok(data(StudentsOutput { students }))
}

pub async fn search_students(
    State(state): State<AppState>,
    _current: CurrentUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Envelope<StudentsOutput>>, ApiError<UserError>> {
    let students = state.credentials().search_students(&query.email).await?;

    Ok(data(StudentsOutput { students }))
}

pub async fn my_courses(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Envelope<CoursesOutput>>, ApiError<EnrollmentError>> {
    let courses = state.enrollment().courses_of(&current.user.id).await?;

    Ok(data(CoursesOutput { courses }))
}

pub fn students_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_students))
        .route("/search", get(search_students))
        .route("/me/courses", get(my_courses))
}
