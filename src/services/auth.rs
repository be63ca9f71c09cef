// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sign-in flow: code exchange, user upsert and session issuance.

use crate::config::Config;
use crate::db::UserStore;
use crate::error::AppError;
use crate::models::{ProviderIdentity, User};
use crate::services::google_oauth::{GoogleOAuthClient, SIGN_IN_SCOPES};
use crate::services::session::SessionManager;
use chrono::Utc;
use std::sync::Arc;

/// Result of a completed sign-in.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: User,
    pub token: String,
}

#[derive(Clone)]
pub struct AuthService {
    oauth: GoogleOAuthClient,
    users: Arc<dyn UserStore>,
    sessions: SessionManager,
    redirect_uri: String,
}

impl AuthService {
    pub fn new(
        config: &Config,
        oauth: GoogleOAuthClient,
        users: Arc<dyn UserStore>,
        sessions: SessionManager,
    ) -> Self {
        Self {
            oauth,
            users,
            sessions,
            redirect_uri: config.google_redirect_url.clone(),
        }
    }

    /// Consent-screen URL for sign-in.
    pub fn authorization_url(&self, state: &str) -> String {
        self.oauth
            .authorization_url(&self.redirect_uri, SIGN_IN_SCOPES, state)
    }

    /// Exchange an authorization code for the caller's provider identity.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
    ) -> Result<ProviderIdentity, AppError> {
        let token = self.oauth.exchange_code(code, &self.redirect_uri).await?;
        self.oauth.fetch_identity(&token.access_token).await
    }

    /// Create the user on first login, otherwise refresh the profile fields.
    ///
    /// A soft-deleted user signing in again is restored.
    pub async fn upsert_user(&self, identity: &ProviderIdentity) -> Result<User, AppError> {
        let now = Utc::now();

        let existing = self
            .users
            .find_by_provider_id(&identity.provider, &identity.subject)
            .await?;

        let mut user = match existing {
            Some(user) => user,
            None => {
                let user = User::from_identity(identity, now);
                match self.users.insert_user(&user).await {
                    Ok(()) => {
                        tracing::info!(user_id = %user.id, provider = %user.provider, "Created user");
                        return Ok(user);
                    }
                    // Lost a race with a concurrent first login for the same identity.
                    Err(AppError::Conflict(msg)) => self
                        .users
                        .find_by_provider_id(&identity.provider, &identity.subject)
                        .await?
                        .ok_or(AppError::Conflict(msg))?,
                    Err(e) => return Err(e),
                }
            }
        };

        if user.is_deleted() {
            tracing::info!(user_id = %user.id, "Restoring soft-deleted user on login");
        }
        user.email = identity.email.clone();
        user.display_name = identity.name.clone();
        user.photo_url = identity.picture.clone();
        user.last_login = Some(now);
        user.updated_at = now;
        user.deleted_at = None;

        self.users.update_user(&user).await?;
        Ok(user)
    }

    /// Complete sign-in for an authorization code.
    pub async fn login(&self, code: &str) -> Result<LoginResult, AppError> {
        let identity = self.exchange_authorization_code(code).await?;
        let user = self.upsert_user(&identity).await?;
        let token = self.sessions.issue(&user)?;

        tracing::info!(user_id = %user.id, "User signed in");
        Ok(LoginResult { user, token })
    }

    /// Re-issue a session for a still-valid token.
    pub async fn refresh_session(&self, token: &str) -> Result<String, AppError> {
        let claims = self.sessions.validate(token)?;
        let user = self
            .users
            .get_user(&claims.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        self.sessions.issue(&user)
    }
}
