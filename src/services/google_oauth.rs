// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google OAuth 2.0 client.
//!
//! Handles:
//! - Authorization URL construction
//! - Authorization code exchange (sign-in and calendar grants)
//! - Access token refresh
//! - Userinfo lookup

use crate::config::Config;
use crate::error::AppError;
use crate::models::ProviderIdentity;
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize};

pub const PROVIDER_GOOGLE: &str = "google";

/// Scopes requested for sign-in.
pub const SIGN_IN_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Scopes requested for the calendar grant.
pub const CALENDAR_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/calendar.readonly",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    /// Only returned on first consent (or with `prompt=consent`)
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds
    #[serde(default = "default_expires_in")]
    pub expires_in: i64,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

fn default_expires_in() -> i64 {
    3600
}

impl OAuthToken {
    /// Absolute expiry for a token received at `now`.
    pub fn expiry(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.expires_in)
    }
}

/// Google userinfo (v2) response.
#[derive(Debug, Clone, Deserialize)]
struct GoogleUserInfo {
    id: String,
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    picture: Option<String>,
}

/// Token endpoint error body, e.g. `{"error": "invalid_grant"}`.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
}

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuthClient {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    auth_url: String,
    token_url: String,
    userinfo_url: String,
}

impl GoogleOAuthClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            auth_url: config.google_auth_url.clone(),
            token_url: config.google_token_url.clone(),
            userinfo_url: config.google_userinfo_url.clone(),
        }
    }

    /// Build the consent-screen URL. Requests offline access so a refresh
    /// token is issued.
    pub fn authorization_url(&self, redirect_uri: &str, scopes: &[&str], state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&access_type=offline&prompt=consent&state={}",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes.join(" ")),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<OAuthToken, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", redirect_uri),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ProviderUnavailable(format!("Token exchange request failed: {}", e))
            })?;

        check_response_json(response).await
    }

    /// Exchange a refresh token for a new access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<OAuthToken, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| {
                AppError::ProviderUnavailable(format!("Token refresh request failed: {}", e))
            })?;

        check_response_json(response).await
    }

    /// Look up the signed-in user's profile.
    pub async fn fetch_identity(&self, access_token: &str) -> Result<ProviderIdentity, AppError> {
        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                AppError::ProviderUnavailable(format!("Userinfo request failed: {}", e))
            })?;

        let info: GoogleUserInfo = check_response_json(response).await?;
        let name = info
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| info.email.clone());

        Ok(ProviderIdentity {
            provider: PROVIDER_GOOGLE.to_string(),
            subject: info.id,
            email: info.email,
            name,
            picture: info.picture.filter(|p| !p.is_empty()),
        })
    }
}

/// Check response status and decode the JSON body.
///
/// 400/401 carrying `invalid_grant` map to [`AppError::InvalidGrant`], 5xx to
/// [`AppError::ProviderUnavailable`], anything else to [`AppError::Upstream`].
pub(crate) async fn check_response_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(classify_error(status, &body));
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Upstream(format!("JSON parse error: {}", e)))
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> AppError {
    if status.is_server_error() {
        return AppError::ProviderUnavailable(format!("HTTP {}", status));
    }

    if status.as_u16() == 400 || status.as_u16() == 401 {
        let is_invalid_grant = serde_json::from_str::<OAuthErrorBody>(body)
            .map(|b| b.error == "invalid_grant")
            .unwrap_or(false);
        if is_invalid_grant {
            return AppError::InvalidGrant;
        }
    }

    AppError::Upstream(format!("HTTP {}: {}", status, body))
}
