use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    errors::{ApiError, CourseError, EnrollmentError},
    routes::{
        exams,
        extract::{AppJson, AppPath, CurrentUser},
    },
    services::{
        database::{Course, CourseDetails, Enrollment},
        enrollment::EnrolledStudent,
    },
    setup::AppState,
    utils::envelope::{data, ok, ok_message, Envelope, NoPayload},
};

#[derive(Debug, Deserialize, Validate)]
pub struct EnrollmentPayload {
    #[validate(length(min = 1, message = "The student id is required"))]
    student_id: String,
}

#[derive(Debug, Serialize)]
pub struct CourseOutput {
    course: Course,
}

#[derive(Debug, Serialize)]
pub struct CoursesOutput {
    courses: Vec<Course>,
}

#[derive(Debug, Serialize)]
pub struct EnrollmentOutput {
    enrollment: Enrollment,
}

#[derive(Debug, Serialize)]
pub struct StudentsOutput {
    students: Vec<EnrolledStudent>,
}

#[axum::debug_handler(state = AppState)]
pub async fn create_course(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(payload): AppJson<CourseDetails>,
) -> Result<(StatusCode, Json<Envelope<CourseOutput>>), ApiError<CourseError>> {
    payload.validate()?;

    let course = state.courses().create(&current.user.id, payload).await?;

    Ok((
        StatusCode::CREATED,
        ok("Course created successfully", CourseOutput { course }),
    ))
}

pub async fn list_courses(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Envelope<CoursesOutput>>, ApiError<CourseError>> {
    let courses = state.courses().list_for_owner(&current.user.id).await?;

    Ok(data(CoursesOutput { courses }))
}

pub async fn get_course(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(course_id): AppPath<String>,
) -> Result<Json<Envelope<CourseOutput>>, ApiError<CourseError>> {
    let course = state
        .courses()
        .get_owned(&course_id, &current.user.id)
        .await?;

    Ok(data(CourseOutput { course }))
}

#[axum::debug_handler(state = AppState)]
pub async fn update_course(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(course_id): AppPath<String>,
    AppJson(payload): AppJson<CourseDetails>,
) -> Result<Json<Envelope<CourseOutput>>, ApiError<CourseError>> {
    payload.validate()?;

    let course = state
        .courses()
        .update(&course_id, &current.user.id, payload)
        .await?;

    Ok(ok("Course updated successfully", CourseOutput { course }))
}

pub async fn delete_course(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(course_id): AppPath<String>,
) -> Result<Json<Envelope<NoPayload>>, ApiError<CourseError>> {
    state
        .courses()
        .delete(&course_id, &current.user.id)
        .await?;

    Ok(ok_message("Course deleted successfully"))
}

#[axum::debug_handler(state = AppState)]
pub async fn enroll_student(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(course_id): AppPath<String>,
    AppJson(payload): AppJson<EnrollmentPayload>,
) -> Result<(StatusCode, Json<Envelope<EnrollmentOutput>>), ApiError<EnrollmentError>> {
    payload.validate()?;

    let enrollment = state
        .enrollment()
        .enroll(&course_id, &payload.student_id, &current.user.id)
        .await?;

    Ok((
        StatusCode::CREATED,
        ok("Student enrolled successfully", EnrollmentOutput { enrollment }),
    ))
}

#[axum::debug_handler(state = AppState)]
pub async fn unenroll_student(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(course_id): AppPath<String>,
    AppJson(payload): AppJson<EnrollmentPayload>,
) -> Result<Json<Envelope<NoPayload>>, ApiError<EnrollmentError>> {
    payload.validate()?;

    state
        .enrollment()
        .unenroll(&course_id, &payload.student_id, &current.user.id)
        .await?;

    Ok(ok_message("Student unenrolled successfully"))
}

pub async fn course_students(
    State(state): State<AppState>,
    current: CurrentUser,
    AppPath(course_id): AppPath<String>,
) -> Result<Json<Envelope<StudentsOutput>>, ApiError<EnrollmentError>> {
    let students = state
        .enrollment()
        .students_of(&course_id, &current.user.id)
        .await?;

    Ok(data(StudentsOutput { students }))
}

pub fn courses_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_course).get(list_courses))
        .route(
            "/:course_id",
            get(get_course).put(update_course).delete(delete_course),
        )
        .route("/:course_id/enroll", post(enroll_student))
        .route("/:course_id/unenroll", post(unenroll_student))
        .route("/:course_id/students", get(course_students))
        .route(
            "/:course_id/exams",
            post(exams::create_course_exam).get(exams::list_course_exams),
        )
        .route(
            "/:course_id/results/:student_id",
            get(exams::student_results),
        )
}
