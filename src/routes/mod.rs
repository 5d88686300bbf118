pub mod auth;
pub mod courses;
pub mod exams;
pub mod extract;
pub mod public_exams;
pub mod students;
pub mod teachers;
pub mod users;

use axum::Router;

use crate::setup::AppState;

fn api_v1_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::auth_router())
        .nest("/users", users::users_router())
        .nest("/students", students::students_router())
        .nest("/teachers", teachers::teachers_router())
        .nest("/courses", courses::courses_router())
        .nest("/exams", exams::exams_router())
        .nest("/public-exams", public_exams::public_exams_router())
}

// Main router that serves as the entry point for all routes
pub fn main_router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_router())
}
