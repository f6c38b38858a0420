//! Session token encoding and decoding.
//!
//! Two decode paths exist on purpose. [`TokenCodec::verify`] checks the HMAC
//! signature and must gate anything that reads or writes protected data.
//! [`decode_unverified`] only base64-decodes the payload and is reserved for
//! page-navigation redirects in the edge filter.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{UserRecord, UserType};

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPayload {
    /// Subject (user id)
    pub sub: String,
    pub email: String,
    pub user_type: UserType,
    /// Expiration (unix seconds). Tokens without it never expire by time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("Malformed token")]
    MalformedToken,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token signature")]
    InvalidSignature,
}

/// Decode claims without checking the signature, using the current clock.
pub fn decode_unverified(token: &str) -> Result<TokenPayload, TokenError> {
    decode_unverified_at(token, Utc::now().timestamp())
}

/// Decode claims without checking the signature.
///
/// Fails with `MalformedToken` unless there are exactly three segments and
/// the middle one is base64url JSON; fails with `Expired` when `exp < now`.
pub fn decode_unverified_at(token: &str, now: i64) -> Result<TokenPayload, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(TokenError::MalformedToken);
    }

    let payload = URL_SAFE_NO_PAD
        .decode(parts[1].trim_end_matches('='))
        .map_err(|_| TokenError::MalformedToken)?;

    let claims: TokenPayload =
        serde_json::from_slice(&payload).map_err(|_| TokenError::MalformedToken)?;

    if matches!(claims.exp, Some(exp) if exp < now) {
        return Err(TokenError::Expired);
    }

    Ok(claims)
}

/// Issues and verifies HS256 session tokens.
#[derive(Clone)]
pub struct TokenCodec {
    keys: Option<(EncodingKey, DecodingKey)>,
    max_age_seconds: i64,
}

impl TokenCodec {
    pub fn new(secret: Option<&Secret<String>>, max_age_seconds: i64) -> Self {
        let keys = secret.map(|s| {
            let bytes = s.expose_secret().as_bytes();
            (EncodingKey::from_secret(bytes), DecodingKey::from_secret(bytes))
        });

        Self {
            keys,
            max_age_seconds,
        }
    }

    pub fn max_age_seconds(&self) -> i64 {
        self.max_age_seconds
    }

    /// Sign a fresh token for `user`. Fails only when no secret is configured.
    pub fn issue(&self, user: &UserRecord, user_type: UserType) -> Result<String, anyhow::Error> {
        let (encoding_key, _) = self
            .keys
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Token secret is not configured"))?;

        let now = Utc::now();
        let claims = TokenPayload {
            sub: user.id.to_string(),
            email: user.email.clone(),
            user_type,
            exp: Some((now + Duration::seconds(self.max_age_seconds)).timestamp()),
            iat: Some(now.timestamp()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, encoding_key)
            .map_err(|e| anyhow::anyhow!("Failed to encode session token: {}", e))
    }

    /// Verify signature and expiry, then return the claims.
    pub fn verify(&self, token: &str) -> Result<TokenPayload, TokenError> {
        if token.split('.').count() != 3 {
            return Err(TokenError::MalformedToken);
        }

        let Some((_, decoding_key)) = self.keys.as_ref() else {
            return Err(TokenError::InvalidSignature);
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = true;
        validation.leeway = 0;

        decode::<TokenPayload>(token, decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                _ => TokenError::MalformedToken,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-session-secret";

    fn codec() -> TokenCodec {
        TokenCodec::new(Some(&Secret::new(SECRET.to_string())), 604_800)
    }

    fn user() -> UserRecord {
        UserRecord {
            id: 42,
            email: "ana@studio.test".to_string(),
            first_name: None,
            last_name: None,
            password_hash: None,
            created_at: Utc::now(),
        }
    }

    fn signed_with(secret: &str, claims: &TokenPayload) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims_expiring_at(exp: i64) -> TokenPayload {
        TokenPayload {
            sub: "42".to_string(),
            email: "ana@studio.test".to_string(),
            user_type: UserType::Student,
            exp: Some(exp),
            iat: None,
        }
    }

    #[test]
    fn test_issued_token_verifies() {
        let codec = codec();
        let token = codec.issue(&user(), UserType::Instructor).unwrap();

        let claims = codec.verify(&token).unwrap();
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.email, "ana@studio.test");
        assert_eq!(claims.user_type, UserType::Instructor);
        let lifetime = claims.exp.unwrap() - claims.iat.unwrap();
        assert_eq!(lifetime, 604_800);
    }

    #[test]
    fn test_wrong_segment_count_is_malformed() {
        assert_eq!(decode_unverified("a.b"), Err(TokenError::MalformedToken));
        assert_eq!(decode_unverified("a.b.c.d"), Err(TokenError::MalformedToken));
        assert_eq!(codec().verify("only-one-segment"), Err(TokenError::MalformedToken));
    }

    #[test]
    fn test_unparsable_payload_is_malformed() {
        assert_eq!(
            decode_unverified("header.!!not-base64!!.sig"),
            Err(TokenError::MalformedToken)
        );
        let not_json = URL_SAFE_NO_PAD.encode(b"plain text");
        assert_eq!(
            decode_unverified(&format!("h.{}.s", not_json)),
            Err(TokenError::MalformedToken)
        );
    }

    #[test]
    fn test_unverified_decode_ignores_signature() {
        let token = signed_with("some-other-secret", &claims_expiring_at(i64::MAX));
        let claims = decode_unverified(&token).unwrap();
        assert_eq!(claims.sub, "42");
    }

    #[test]
    fn test_unverified_decode_rejects_expired() {
        let token = signed_with(SECRET, &claims_expiring_at(1_000));
        assert_eq!(decode_unverified_at(&token, 1_001), Err(TokenError::Expired));
        assert!(decode_unverified_at(&token, 1_000).is_ok());
    }

    #[test]
    fn test_missing_exp_never_expires() {
        let mut claims = claims_expiring_at(0);
        claims.exp = None;
        let token = signed_with(SECRET, &claims);
        assert!(decode_unverified(&token).is_ok());
        assert!(codec().verify(&token).is_ok());
    }

    #[test]
    fn test_verify_rejects_foreign_signature() {
        let token = signed_with("some-other-secret", &claims_expiring_at(i64::MAX));
        assert_eq!(codec().verify(&token), Err(TokenError::InvalidSignature));
    }

    #[test]
    fn test_verify_rejects_expired() {
        let past = Utc::now().timestamp() - 60;
        let token = signed_with(SECRET, &claims_expiring_at(past));
        assert_eq!(codec().verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_missing_secret_fails_closed() {
        let codec = TokenCodec::new(None, 604_800);
        let token = signed_with(SECRET, &claims_expiring_at(i64::MAX));

        assert_eq!(codec.verify(&token), Err(TokenError::InvalidSignature));
        assert!(codec.issue(&user(), UserType::Student).is_err());
    }
}
