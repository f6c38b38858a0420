//! Route boundary: turns the session cookie into a verified caller.
//!
//! Handlers that touch protected data take a [`CurrentUser`] and then ask
//! [`AppState::authorize`](crate::AppState::authorize) for the specific
//! resource before any read or write.

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use service_core::error::AppError;

use crate::auth::Identity;
use crate::models::UserRecord;
use crate::AppState;

pub const AUTH_COOKIE: &str = "auth-token";

/// Session cookie issued on login.
pub fn session_cookie(token: String, max_age_seconds: i64, secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age_seconds))
        .build()
}

/// Overwrites the session cookie with an empty value that expired at the epoch.
pub fn cleared_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((AUTH_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::ZERO)
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .build()
}

/// Reject a request that lacks a scoping parameter, before any authorization.
pub fn require_param(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing {} parameter", name)))
}

/// Caller resolved from a signature-verified session token.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: Identity,
    pub user: UserRecord,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(AUTH_COOKIE).map(|c| c.value().to_string());

        let (identity, user) = state.sessions.resolve_user(token.as_deref()).await?;

        tracing::Span::current().record("user_id", identity.user_id);

        Ok(CurrentUser { identity, user })
    }
}
