// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Stateless HS256 session tokens.

use crate::error::AppError;
use crate::models::User;
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session token claims.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub user_id: String,
    pub email: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Issues and validates session tokens with a shared secret.
///
/// There is no revocation list: a token stays valid until `exp`.
#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(signing_key: &[u8], ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(signing_key),
            decoding_key: DecodingKey::from_secret(signing_key),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token for `user` valid for the configured TTL.
    pub fn issue(&self, user: &User) -> Result<String, AppError> {
        self.issue_at(user, Utc::now())
    }

    fn issue_at(&self, user: &User, now: DateTime<Utc>) -> Result<String, AppError> {
        let iat = now.timestamp();
        let claims = SessionClaims {
            user_id: user.id.clone(),
            email: user.email.clone(),
            iat,
            exp: iat + self.ttl.as_secs() as i64,
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &SessionClaims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))
    }

    /// Verify signature and expiry (no leeway).
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AppError::TokenExpired,
                _ => {
                    tracing::debug!(error = %e, "Rejected session token");
                    AppError::TokenInvalid
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProviderIdentity;

    fn manager() -> SessionManager {
        SessionManager::new(b"test_jwt_key_32_bytes_minimum!!", Duration::from_secs(3600))
    }

    fn user() -> User {
        let identity = ProviderIdentity {
            provider: "google".to_string(),
            subject: "g1".to_string(),
            email: "a@b.com".to_string(),
            name: "A B".to_string(),
            picture: None,
        };
        User::from_identity(&identity, Utc::now())
    }

    #[test]
    fn test_issue_then_validate() {
        let sessions = manager();
        let user = user();
        let token = sessions.issue(&user).unwrap();

        let claims = sessions.validate(&token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let sessions = manager();
        let token = sessions
            .issue_at(&user(), Utc::now() - chrono::Duration::hours(2))
            .unwrap();

        assert!(matches!(
            sessions.validate(&token),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_tampered_or_foreign_token_is_invalid() {
        let sessions = manager();
        let token = sessions.issue(&user()).unwrap();

        let other = SessionManager::new(b"another_key_entirely_different!!", Duration::from_secs(3600));
        assert!(matches!(other.validate(&token), Err(AppError::TokenInvalid)));

        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(
            sessions.validate(&tampered),
            Err(AppError::TokenInvalid)
        ));

        assert!(matches!(
            sessions.validate("not.a.jwt"),
            Err(AppError::TokenInvalid)
        ));
    }
}
