use axum::{extract::State, Json};
use hyper::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use validator::Validate;

use crate::{
    errors::{ApiError, SignupError},
    services::{
        credentials::NewAccount,
        database::{Role, UserProfile},
    },
    routes::extract::AppJson,
    setup::AppState,
    utils::{
        envelope::{ok, Envelope},
        validation::{validate_not_blank, validate_password_strength},
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct RoutePayload {
    #[validate(
        length(min = 1, max = 50, message = "Username must be between 1 and 50 characters"),
        custom(function = "validate_not_blank")
    )]
    username: String,
    #[validate(email(message = "The email address is invalid"))]
    email: String,
    #[validate(custom(function = "validate_password_strength"))]
    password: String,
    role: Option<Role>,
    #[validate(length(max = 100, message = "Class subject must be at most 100 characters"))]
    class_subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RouteOutput {
    user: UserProfile,
}

#[axum::debug_handler(state = AppState)]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RoutePayload>,
) -> Result<(StatusCode, Json<Envelope<RouteOutput>>), ApiError<SignupError>> {
    // 1. Validate payload input
    payload.validate()?;
    debug!("signup payload validated");

    // 2. Create the account
    let user = state
        .credentials()
        .signup(NewAccount {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            role: payload.role.unwrap_or(Role::Student),
            class_subject: payload.class_subject,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        ok("User registered successfully", RouteOutput { user }),
    ))
}
