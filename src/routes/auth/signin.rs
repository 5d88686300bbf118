use axum::{extract::State, Json};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use validator::Validate;

use crate::{
    errors::{ApiError, SigninError},
    services::database::UserProfile,
    routes::extract::AppJson,
    setup::AppState,
    utils::{
        cookies::set_session_cookie,
        envelope::{ok, Envelope},
    },
};

#[derive(Debug, Deserialize, Validate)]
pub struct RoutePayload {
    #[validate(email(message = "The email address is invalid"))]
    email: String,
    #[validate(length(min = 1, message = "The password is required"))]
    password: String,
}

#[derive(Debug, Serialize)]
pub struct RouteOutput {
    token: String,
    expires_at: DateTime<Utc>,
    user: UserProfile,
}

#[axum::debug_handler(state = AppState)]
pub async fn signin(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(payload): AppJson<RoutePayload>,
) -> Result<(CookieJar, Json<Envelope<RouteOutput>>), ApiError<SigninError>> {
    // 1. Validate payload input
    payload.validate()?;
    debug!("signin payload validated");

    // 2. Verify credentials
    let user = state
        .credentials()
        .verify(&payload.email, &payload.password)
        .await?;

    // 3. Create a session in database
    let session = state
        .sessions()
        .create(&user.id)
        .await
        .map_err(SigninError::from)?;
    info!(user_id = %user.id, "user signed in");

    // 4. Create a session cookie
    let cookie = set_session_cookie(
        session.token.clone(),
        session.expires_at,
        state.config.secure_cookies,
    );

    Ok((
        jar.add(cookie),
        ok(
            "Signin completed successfully",
            RouteOutput {
                token: session.token,
                expires_at: session.expires_at,
                user: UserProfile::from(&user),
            },
        ),
    ))
}
