use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Utc};
use cookie::time::OffsetDateTime;

pub const SESSION_COOKIE: &str = "session_id";

pub fn set_session_cookie(
    session_token: String,
    expires_at: DateTime<Utc>,
    secure: bool,
) -> Cookie<'static> {
    let builder = Cookie::build((SESSION_COOKIE, session_token))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .http_only(true);

    match OffsetDateTime::from_unix_timestamp(expires_at.timestamp()) {
        Ok(expiration_time) => builder.expires(expiration_time).build(),
        // Out-of-range expiry: fall back to a browser-session cookie.
        Err(_) => builder.build(),
    }
}

pub fn clear_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, "")).path("/").build()
}
