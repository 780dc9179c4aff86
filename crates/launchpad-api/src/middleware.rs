use axum::{
    RequestPartsExt,
    extract::{Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    extract::CookieJar,
    headers::{Authorization, authorization::Bearer},
};

use launchpad_types::models::PublicUser;

use crate::auth;
use crate::error::ApiError;
use crate::state::{AppState, blocking, current_time};

/// Name of the HttpOnly cookie carrying the session token.
pub const SESSION_COOKIE: &str = "token";

/// The authenticated caller, inserted into request extensions by
/// [`require_auth`].
#[derive(Debug, Clone)]
pub struct CurrentUser(pub PublicUser);

/// Session token from `Authorization: Bearer` or, failing that, the session
/// cookie.
pub async fn session_token(parts: &mut Parts) -> Option<String> {
    if let Ok(TypedHeader(Authorization(bearer))) =
        parts.extract::<TypedHeader<Authorization<Bearer>>>().await
    {
        return Some(bearer.token().to_string());
    }

    CookieJar::from_headers(&parts.headers)
        .get(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolve the session token to a user and expose it as [`CurrentUser`].
pub async fn require_auth(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = req.into_parts();

    let token = session_token(&mut parts).await.ok_or(ApiError::Unauthorized)?;

    let now = current_time();
    let user = blocking(&state, move |s| auth::resolve_token(s, &token, now))
        .await
        .map_err(|e| match e {
            // a token for a deleted account is just a bad token here
            ApiError::UserNotFound => ApiError::InvalidToken,
            other => other,
        })?;

    parts.extensions.insert(CurrentUser(user));
    Ok(next.run(Request::from_parts(parts, body)).await)
}
