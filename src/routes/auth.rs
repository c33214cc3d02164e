//! Session routes — caller context, sign-out, dev session bootstrap.

use axum::extract::{FromRef, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;
use tracing::{error, warn};

use crate::model::User;
use crate::services::session::{self, SessionContext, SessionError};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

/// Session token from `Authorization: Bearer` or the session cookie.
pub(crate) fn request_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_owned());
    }
    let jar = CookieJar::from_headers(headers);
    jar.get(COOKIE_NAME)
        .map(Cookie::value)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated caller resolved from the session token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: User,
    pub token: String,
}

impl From<SessionContext> for AuthUser {
    fn from(ctx: SessionContext) -> Self {
        Self { user: ctx.user, token: ctx.token }
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = request_token(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;

        let app_state = AppState::from_ref(state);
        let ctx = session::resolve_session(app_state.store.as_ref(), &token)
            .await
            .map_err(|e| {
                error!(error = %e, "session lookup failed");
                StatusCode::INTERNAL_SERVER_ERROR
            })?
            .ok_or(StatusCode::UNAUTHORIZED)?;

        Ok(ctx.into())
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// `GET /api/session/me` — return the caller's context.
pub async fn me(auth: AuthUser) -> Json<SessionContext> {
    Json(SessionContext { user: auth.user, token: auth.token })
}

/// `DELETE /api/session` — end the session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::end_session(state.store.as_ref(), &auth.token).await {
        warn!(error = %e, user_id = %auth.user.id, "session removal failed");
    }

    let cookie = Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.cookie_secure)
        .max_age(Duration::ZERO);

    let jar = CookieJar::new().add(cookie);
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DevSessionBody {
    pub user_id: String,
}

/// `POST /api/dev/session` — issue a session for an existing user without the
/// external sign-in.
///
/// Enabled only when `DEV_SESSION_ISSUE=true`.
pub async fn dev_session(
    State(state): State<AppState>,
    Json(body): Json<DevSessionBody>,
) -> Result<(CookieJar, Json<serde_json::Value>), StatusCode> {
    if !state.config.dev_session_issue {
        return Err(StatusCode::NOT_FOUND);
    }

    let token = session::create_session(state.store.as_ref(), &body.user_id, state.config.session_ttl)
        .await
        .map_err(session_error_to_status)?;

    let jar = CookieJar::new().add(session_cookie(token.clone(), state.config.cookie_secure));
    Ok((jar, Json(serde_json::json!({ "token": token }))))
}

pub(crate) fn session_error_to_status(err: SessionError) -> StatusCode {
    match err {
        SessionError::UnknownUser(_) => StatusCode::NOT_FOUND,
        SessionError::Store(e) => super::store_error_to_status(&e),
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
