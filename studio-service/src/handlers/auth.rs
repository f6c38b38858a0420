use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;
use service_core::error::{ApiMessage, AppError};

use crate::{
    dtos::auth::{
        CheckUserRequest, CheckUserResponse, LoginRequest, SessionUserResponse,
        SetPasswordRequest, SignupRequest,
    },
    middleware::{cleared_session_cookie, session_cookie, CurrentUser},
    models::{NewUser, UserType},
    utils::{hash_password, verify_password, Password, PasswordHashString, ValidatedJson},
    AppState,
};

#[tracing::instrument(skip_all, fields(user_type = %req.user_type))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<(CookieJar, Json<SessionUserResponse>), AppError> {
    let invalid = || AppError::Unauthorized(anyhow::anyhow!("Invalid email or password"));

    let user = state
        .store
        .find_user(req.user_type, &req.email)
        .await?
        .ok_or_else(invalid)?;

    let Some(hash) = user.password_hash.clone().filter(|h| !h.is_empty()) else {
        tracing::info!(user_id = user.id, "Login attempted for account without a password");
        return Err(invalid());
    };

    verify_password(
        &Password::new(req.password),
        &PasswordHashString::new(hash),
    )
    .map_err(|_| {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        invalid()
    })?;

    let token = state
        .sessions
        .codec()
        .issue(&user, req.user_type)
        .map_err(AppError::InternalError)?;

    let cookie = session_cookie(
        token,
        state.config.session.max_age_seconds,
        state.config.is_production(),
    );

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        jar.add(cookie),
        Json(SessionUserResponse {
            success: true,
            user: user.sanitized(),
            user_type: req.user_type,
        }),
    ))
}

/// Always succeeds; the cookie is overwritten even if it was already gone.
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Json<ApiMessage>) {
    let jar = jar.add(cleared_session_cookie(state.config.is_production()));
    (jar, Json(ApiMessage::ok("Logged out successfully")))
}

pub async fn current_user(current: CurrentUser) -> Json<SessionUserResponse> {
    Json(SessionUserResponse {
        success: true,
        user: current.user.sanitized(),
        user_type: current.identity.user_type,
    })
}

#[tracing::instrument(skip_all, fields(user_type = %req.user_type))]
pub async fn signup(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SignupRequest>,
) -> Result<(StatusCode, Json<SessionUserResponse>), AppError> {
    if req.user_type == UserType::Admin {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Admin accounts cannot be created through signup"
        )));
    }

    let password_hash = hash_password(&Password::new(req.password))?;

    let user = state
        .store
        .insert_user(
            req.user_type,
            NewUser {
                email: req.email.trim().to_lowercase(),
                first_name: req.first_name,
                last_name: req.last_name,
                password_hash: Some(password_hash.into_string()),
            },
        )
        .await?;

    tracing::info!(user_id = user.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SessionUserResponse {
            success: true,
            user: user.sanitized(),
            user_type: req.user_type,
        }),
    ))
}

pub async fn check_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CheckUserRequest>,
) -> Result<Json<CheckUserResponse>, AppError> {
    let user = state.store.find_user(req.user_type, &req.email).await?;

    Ok(Json(CheckUserResponse {
        success: true,
        exists: user.is_some(),
        has_password: user.as_ref().is_some_and(|u| u.has_password()),
    }))
}

/// First-time password for an account created by a studio (invited client).
#[tracing::instrument(skip_all, fields(user_type = %req.user_type))]
pub async fn set_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<SetPasswordRequest>,
) -> Result<Json<ApiMessage>, AppError> {
    let user = state
        .store
        .find_user(req.user_type, &req.email)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))?;

    if user.has_password() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Password already set for this account"
        )));
    }

    let password_hash = hash_password(&Password::new(req.password))?;
    state
        .store
        .set_user_password(req.user_type, user.id, password_hash.as_str())
        .await?;

    tracing::info!(user_id = user.id, "Initial password set");

    Ok(Json(ApiMessage::ok("Password set successfully")))
}
