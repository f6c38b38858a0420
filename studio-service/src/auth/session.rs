use serde::Serialize;
use service_core::error::AppError;
use std::sync::Arc;
use thiserror::Error;

use super::token::{TokenCodec, TokenError};
use crate::models::{UserRecord, UserType};
use crate::store::StudioStore;

/// Trusted caller identity, rebuilt from a verified token on every request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    pub user_type: UserType,
    pub user_id: i64,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Invalid token: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("User not found")]
    UserNotFound,

    #[error("Store error: {0}")]
    Store(AppError),
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Unauthenticated => AppError::Unauthenticated,
            AuthError::InvalidToken(_) => AppError::InvalidToken,
            AuthError::UserNotFound => AppError::UserNotFound,
            AuthError::Store(e) => e,
        }
    }
}

/// Resolves raw session tokens into identities.
#[derive(Clone)]
pub struct SessionResolver {
    codec: TokenCodec,
    store: Arc<dyn StudioStore>,
}

impl SessionResolver {
    pub fn new(codec: TokenCodec, store: Arc<dyn StudioStore>) -> Self {
        Self { codec, store }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify the token and confirm the account still exists.
    pub async fn resolve(&self, token: Option<&str>) -> Result<Identity, AuthError> {
        self.resolve_user(token)
            .await
            .map(|(identity, _)| identity)
    }

    /// Like [`resolve`](Self::resolve) but also hands back the user row.
    pub async fn resolve_user(
        &self,
        token: Option<&str>,
    ) -> Result<(Identity, UserRecord), AuthError> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        let claims = self.codec.verify(token).map_err(|e| {
            tracing::debug!(error = %e, "Session token rejected");
            AuthError::InvalidToken(e)
        })?;

        let user = self
            .store
            .find_user(claims.user_type, &claims.email)
            .await
            .map_err(AuthError::Store)?
            .ok_or_else(|| {
                tracing::info!(
                    email = %claims.email,
                    user_type = %claims.user_type,
                    "Session token references a missing user"
                );
                AuthError::UserNotFound
            })?;

        let identity = Identity {
            email: user.email.clone(),
            user_type: claims.user_type,
            user_id: user.id,
        };

        Ok((identity, user))
    }
}
