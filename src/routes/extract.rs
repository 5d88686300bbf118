use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts},
    http::{header, request::Parts},
};
use axum_extra::extract::CookieJar;

use crate::{
    errors::{ApiError, RequestError, SessionError},
    services::database::User,
    setup::AppState,
    utils::cookies::SESSION_COOKIE,
};

/// JSON body whose rejections (bad syntax, wrong types, missing fields) answer with
/// the error envelope instead of axum's plain-text 422.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(RequestError))]
pub struct AppJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(RequestError))]
pub struct AppPath<T>(pub T);

/// The signed-in caller. Resolved from `Authorization: Bearer <token>` first, then
/// from the session cookie.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();

    (!token.is_empty()).then(|| token.to_string())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar.get(SESSION_COOKIE)?.value().trim().to_string();

    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError<SessionError>;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .or_else(|| cookie_token(parts))
            .ok_or(ApiError(SessionError::MissingToken))?;

        let user = state.sessions().authenticate(&token).await?;

        Ok(CurrentUser { user, token })
    }
}
