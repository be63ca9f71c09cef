// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google sign-in routes and session management.

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    routing::post,
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::SESSION_COOKIE;
use crate::routes::bad_json;
use crate::routes::user::UserResponse;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Maximum age of an OAuth state parameter.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

/// Tolerated clock skew for states minted slightly in the future.
const STATE_CLOCK_SKEW_MS: u128 = 60 * 1000;

/// HKDF info string separating the state key from the session key.
const STATE_KEY_INFO: &[u8] = b"weather-companion oauth-state v1";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/google", post(auth_start))
        .route(
            "/auth/google/callback",
            post(auth_callback).get(auth_callback),
        )
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
}

// ─── OAuth state ─────────────────────────────────────────────

/// Derive the state signing key from the session secret.
fn state_key(secret: &[u8]) -> Result<[u8; 32]> {
    let mut key = [0u8; 32];
    Hkdf::<Sha256>::new(None, secret)
        .expand(STATE_KEY_INFO, &mut key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HKDF expand failed: {}", e)))?;
    Ok(key)
}

fn now_millis() -> Result<u128> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis())
}

fn state_signature(key: &[u8], payload: &str) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Build a signed state: base64url("nonce|timestamp_hex|signature_hex").
fn sign_state(key: &[u8], nonce: &str, timestamp_ms: u128) -> Result<String> {
    let payload = format!("{}|{:x}", nonce, timestamp_ms);
    let signature = state_signature(key, &payload)?;
    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Check signature and age of a state produced by [`sign_state`].
fn verify_state(state: &str, key: &[u8], now_ms: u128) -> bool {
    let Some(decoded) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|b| String::from_utf8(b).ok())
    else {
        return false;
    };

    let parts: Vec<&str> = decoded.splitn(3, '|').collect();
    let [nonce, timestamp_hex, signature_hex] = parts.as_slice() else {
        return false;
    };

    let Ok(provided) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(expected) = state_signature(key, &format!("{}|{}", nonce, timestamp_hex)) else {
        return false;
    };
    if !bool::from(expected.ct_eq(&provided)) {
        tracing::warn!("OAuth state signature mismatch");
        return false;
    }

    let Ok(timestamp) = u128::from_str_radix(timestamp_hex, 16) else {
        return false;
    };
    timestamp <= now_ms + STATE_CLOCK_SKEW_MS && now_ms.saturating_sub(timestamp) <= STATE_MAX_AGE_MS
}

/// Mint a fresh signed state for a consent redirect.
pub(crate) fn mint_state(secret: &[u8]) -> Result<String> {
    let key = state_key(secret)?;
    let nonce = uuid::Uuid::new_v4().simple().to_string();
    sign_state(&key, &nonce, now_millis()?)
}

/// Reject a state that fails verification or is too old.
pub(crate) fn check_state(secret: &[u8], oauth_state: &str) -> Result<()> {
    let key = state_key(secret)?;
    if !verify_state(oauth_state, &key, now_millis()?) {
        return Err(AppError::BadRequest(
            "Invalid or expired OAuth state".to_string(),
        ));
    }
    Ok(())
}

// ─── Handlers ────────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct AuthUrlResponse {
    pub url: String,
}

/// Start OAuth flow - return the Google consent URL.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Json<AuthUrlResponse>> {
    let oauth_state = mint_state(&state.config.jwt_signing_key)?;

    tracing::info!("Starting Google OAuth flow");
    Ok(Json(AuthUrlResponse {
        url: state.auth_service.authorization_url(&oauth_state),
    }))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserResponse,
}

fn session_cookie(token: String, max_age_secs: u64, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age_secs as i64))
        .build()
}

/// OAuth callback - exchange code, upsert user, create session.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        return Err(AppError::BadRequest(format!("OAuth error: {}", error)));
    }

    // A relayed callback may omit state; a present one must verify.
    if let Some(oauth_state) = params.state.as_deref() {
        check_state(&state.config.jwt_signing_key, oauth_state)?;
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let login = state.auth_service.login(&code).await?;

    let cookie = session_cookie(
        login.token.clone(),
        state.sessions.ttl().as_secs(),
        state.config.is_production(),
    );

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            token: login.token,
            user: login.user.into(),
        }),
    ))
}

#[derive(Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1))]
    token: String,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct TokenResponse {
    pub token: String,
}

/// Exchange a still-valid session token for a fresh one.
async fn refresh(
    State(state): State<Arc<AppState>>,
    body: std::result::Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>> {
    let Json(request) = body.map_err(bad_json)?;
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let token = state.auth_service.refresh_session(&request.token).await?;
    Ok(Json(TokenResponse { token }))
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Logout - clear the session cookie. Bearer tokens are discarded client-side.
async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        jar.remove(Cookie::build(SESSION_COOKIE).path("/")),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}
