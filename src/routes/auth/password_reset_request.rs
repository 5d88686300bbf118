use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use validator::Validate;

use crate::{
    errors::{ApiError, PasswordResetError},
    routes::extract::AppJson,
    setup::AppState,
    utils::{
        envelope::{ok, Envelope},
        validation::normalize_email,
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct RoutePayload {
    #[validate(email(message = "The email address is invalid"))]
    email: String,
}

#[derive(Debug, Serialize)]
pub struct RouteOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    reset_token: Option<String>,
}

#[axum::debug_handler(state = AppState)]
pub async fn password_reset_request(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RoutePayload>,
) -> Result<Json<Envelope<RouteOutput>>, ApiError<PasswordResetError>> {
    // 1. Validate payload input
    payload.validate()?;
    debug!("password reset request payload validated");

    // 2. Issue the reset token
    let issued = state.password_reset().issue(&payload.email).await?;

    // 3. Send the reset email without holding up the response
    let email_layer = state.email.clone();
    let recipient = normalize_email(&payload.email);
    let token = issued.token.clone();
    tokio::spawn(async move {
        if let Err(error) = email_layer.send_password_reset(recipient, token).await {
            error!(?error, "failed to send password reset email");
        }
    });

    let reset_token = state.config.expose_reset_tokens.then_some(issued.token);

    Ok(ok(
        "Password reset instructions have been sent",
        RouteOutput { reset_token },
    ))
}
