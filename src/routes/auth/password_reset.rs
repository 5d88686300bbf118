use axum::{extract::State, Json};
use serde::Deserialize;
use tracing::debug;
use validator::Validate;

use crate::{
    errors::{ApiError, PasswordResetError},
    routes::extract::AppJson,
    setup::AppState,
    utils::{
        envelope::{ok_message, Envelope, NoPayload},
        validation::{validate_password_strength, validate_token_format},
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct RoutePayload {
    #[validate(custom(function = "validate_token_format"))]
    token: String,
    #[validate(custom(function = "validate_password_strength"))]
    new_password: String,
}

#[axum::debug_handler(state = AppState)]
pub async fn password_reset(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RoutePayload>,
) -> Result<Json<Envelope<NoPayload>>, ApiError<PasswordResetError>> {
    // 1. Validate payload input
    payload.validate()?;
    debug!("password reset payload validated");

    // 2. Redeem the token and replace the password
    state
        .password_reset()
        .consume(&payload.token, &payload.new_password)
        .await?;

    Ok(ok_message("Password reset completed successfully"))
}
