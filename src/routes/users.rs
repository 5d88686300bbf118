use axum::{
    extract::State,
    routing::{get, put},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    errors::{ApiError, UserError},
    routes::extract::{AppJson, AppPath, CurrentUser},
    services::{
        credentials::ProfileUpdate,
        database::{Role, UserProfile},
    },
    setup::AppState,
    utils::{
        cookies::clear_session_cookie,
        envelope::{data, ok, ok_message, Envelope, NoPayload},
        validation::validate_not_blank,
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct ProfilePayload {
    #[validate(
        length(min = 1, max = 50, message = "Username must be between 1 and 50 characters"),
        custom(function = "validate_not_blank")
    )]
    username: Option<String>,
    #[validate(length(max = 100, message = "Class subject must be at most 100 characters"))]
    class_subject: Option<String>,
    #[validate(url(message = "The profile picture must be a URL"))]
    profile_picture: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct PreferencesPayload {
    role: Role,
    #[validate(length(max = 100, message = "Class subject must be at most 100 characters"))]
    class_subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UserOutput {
    user: UserProfile,
}

#[axum::debug_handler(state = AppState)]
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(payload): AppJson<ProfilePayload>,
) -> Result<Json<Envelope<UserOutput>>, ApiError<UserError>> {
    payload.validate()?;

    let user = state
        .credentials()
        .update_profile(
            &current.user.id,
            ProfileUpdate {
                username: payload.username,
                class_subject: payload.class_subject,
                profile_picture: payload.profile_picture,
            },
        )
        .await?;

    Ok(ok("Profile updated successfully", UserOutput { user }))
}

#[axum::debug_handler(state = AppState)]
pub async fn update_preferences(
    State(state): State<AppState>,
    current: CurrentUser,
    AppJson(payload): AppJson<PreferencesPayload>,
) -> Result<Json<Envelope<UserOutput>>, ApiError<UserError>> {
    payload.validate()?;

    let user = state
        .credentials()
        .update_preferences(&current.user.id, payload.role, payload.class_subject)
        .await?;

    Ok(ok("Preferences updated successfully", UserOutput { user }))
}

#[axum::debug_handler(state = AppState)]
pub async fn delete_account(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Envelope<NoPayload>>), ApiError<UserError>> {
    state.credentials().deactivate(&current.user.id).await?;

    Ok((
        jar.add(clear_session_cookie()),
        ok_message("Account deleted successfully"),
    ))
}

#[axum::debug_handler(state = AppState)]
pub async fn get_user(
    State(state): State<AppState>,
    _current: CurrentUser,
    AppPath(user_id): AppPath<String>,
) -> Result<Json<Envelope<UserOutput>>, ApiError<UserError>> {
    let user = state.credentials().profile(&user_id).await?;

    Ok(data(UserOutput { user }))
}

pub fn users_router() -> Router<AppState> {
    Router::new()
        .route("/me", put(update_profile).delete(delete_account))
        .route("/me/preferences", put(update_preferences))
        .route("/:user_id", get(get_user))
}
