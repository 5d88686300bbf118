use axum::{extract::State, Json};
use axum_extra::extract::CookieJar;
use tracing::info;

use crate::{
    errors::{ApiError, SessionError},
    routes::extract::CurrentUser,
    setup::AppState,
    utils::{
        cookies::clear_session_cookie,
        envelope::{ok_message, Envelope, NoPayload},
    },
};

#[axum::debug_handler(state = AppState)]
pub async fn signout(
    State(state): State<AppState>,
    current: CurrentUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<Envelope<NoPayload>>), ApiError<SessionError>> {
    state.sessions().revoke(&current.token).await?;
    info!(user_id = %current.user.id, "user signed out");

    Ok((jar.add(clear_session_cookie()), ok_message("Signed out successfully")))
}
