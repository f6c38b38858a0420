//! Global edge filter.
//!
//! Runs ahead of every route. Page decisions use the unverified token decode
//! and are only redirects; the API namespace outside the public allow-list is
//! rejected outright when no usable token is present. Logout is the one API
//! route a stale cookie may still reach. Handlers still verify
//! the signature through [`CurrentUser`](super::CurrentUser).

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use super::session::{cleared_session_cookie, AUTH_COOKIE};
use crate::auth::decode_unverified;
use crate::dtos::ErrorResponse;
use crate::AppState;

/// API routes reachable without a session.
pub const PUBLIC_API_ROUTES: &[&str] = &[
    "/api/auth/login",
    "/api/auth/signup",
    "/api/auth/check-user",
    "/api/auth/set-password",
];

/// Ends a session. Needs a cookie to get past the filter, but not a live one.
const LOGOUT_ROUTE: &str = "/api/auth/logout";

const AUTH_PAGES: &[&str] = &["/login", "/signup"];

const PROTECTED_PAGE_PREFIXES: &[&str] = &[
    "/dashboard",
    "/studios",
    "/clients",
    "/lessons",
    "/homework",
    "/notebook",
    "/exercises",
    "/profile",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Root,
    AuthPage,
    ProtectedPage,
    PublicApi,
    Logout,
    ProtectedApi,
    /// Static assets, uploads, health. The filter leaves these alone.
    Other,
}

fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn classify_route(path: &str) -> RouteClass {
    let trimmed = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };

    if trimmed == "/" || trimmed.is_empty() {
        return RouteClass::Root;
    }

    if matches_prefix(trimmed, "/api") {
        return if PUBLIC_API_ROUTES.contains(&trimmed) {
            RouteClass::PublicApi
        } else if trimmed == LOGOUT_ROUTE {
            RouteClass::Logout
        } else {
            RouteClass::ProtectedApi
        };
    }

    if AUTH_PAGES.contains(&trimmed) {
        return RouteClass::AuthPage;
    }

    if PROTECTED_PAGE_PREFIXES
        .iter()
        .any(|prefix| matches_prefix(trimmed, prefix))
    {
        return RouteClass::ProtectedPage;
    }

    RouteClass::Other
}

/// Drop the session cookie from the inbound `Cookie` header, keeping the rest.
fn strip_session_cookie(headers: &mut HeaderMap) {
    let jar = CookieJar::from_headers(headers);
    let remaining: Vec<String> = jar
        .iter()
        .filter(|c| c.name() != AUTH_COOKIE)
        .map(|c| format!("{}={}", c.name(), c.value()))
        .collect();

    headers.remove(header::COOKIE);
    if remaining.is_empty() {
        return;
    }
    match HeaderValue::from_str(&remaining.join("; ")) {
        Ok(value) => {
            headers.insert(header::COOKIE, value);
        }
        Err(e) => tracing::warn!(error = %e, "Could not rebuild cookie header"),
    }
}

/// Whether a handler already wrote the session cookie (login, logout).
fn sets_session_cookie(headers: &HeaderMap) -> bool {
    let prefix = format!("{}=", AUTH_COOKIE);
    headers
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(&prefix))
}

pub async fn edge_filter_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let class = classify_route(req.uri().path());

    let token = CookieJar::from_headers(req.headers())
        .get(AUTH_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty());

    let (authenticated, stale) = match token.as_deref().map(decode_unverified) {
        None => (false, false),
        Some(Ok(_)) => (true, false),
        Some(Err(e)) => {
            tracing::debug!(error = %e, path = %req.uri().path(), "Discarding stale session cookie");
            (false, true)
        }
    };

    if stale {
        strip_session_cookie(req.headers_mut());
    }

    let mut response = match (authenticated, class) {
        (false, RouteClass::ProtectedPage | RouteClass::Root) => {
            Redirect::temporary("/login").into_response()
        }
        (false, RouteClass::Logout) if stale => next.run(req).await,
        (false, RouteClass::ProtectedApi | RouteClass::Logout) => (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                success: false,
                error: "Unauthorized".to_string(),
            }),
        )
            .into_response(),
        (true, RouteClass::AuthPage | RouteClass::Root) => {
            Redirect::temporary("/dashboard").into_response()
        }
        _ => next.run(req).await,
    };

    if stale && !sets_session_cookie(response.headers()) {
        let cleared = cleared_session_cookie(state.config.is_production());
        match HeaderValue::from_str(&cleared.to_string()) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "Could not encode cleared session cookie"),
        }
    }

    response
}
