// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile routes for the signed-in user.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{UpdateUserRequest, Units, User};
use crate::routes::bad_json;
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/user/me", get(get_me).put(update_me).delete(delete_me))
}

/// Current user response.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    pub timezone: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "\"metric\" | \"imperial\""))]
    pub units: Units,
    pub notifications: bool,
    pub created_at: String,
    pub updated_at: String,
    pub last_login: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            photo_url: user.photo_url,
            timezone: user.timezone,
            units: user.units,
            notifications: user.notifications,
            created_at: format_utc_rfc3339(user.created_at),
            updated_at: format_utc_rfc3339(user.updated_at),
            last_login: user.last_login.map(format_utc_rfc3339),
        }
    }
}

async fn load_user(state: &AppState, user_id: &str) -> Result<User> {
    state
        .users
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
}

/// Get current user profile.
async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<UserResponse>> {
    let user = load_user(&state, &auth.user_id).await?;
    Ok(Json(user.into()))
}

/// Update display name and preferences.
async fn update_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<UserResponse>> {
    let Json(request) = body.map_err(bad_json)?;
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut user = load_user(&state, &auth.user_id).await?;
    request.apply_to(&mut user);
    user.updated_at = Utc::now();
    state.users.update_user(&user).await?;

    tracing::info!(user_id = %user.id, "Updated user profile");
    Ok(Json(user.into()))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct DeleteAccountResponse {
    pub success: bool,
    pub message: String,
}

/// Soft delete the account and drop any calendar grant.
async fn delete_me(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DeleteAccountResponse>> {
    load_user(&state, &auth.user_id).await?;

    state.calendar_service.disconnect(&auth.user_id).await?;
    state
        .users
        .soft_delete_user(&auth.user_id, Utc::now())
        .await?;

    tracing::info!(user_id = %auth.user_id, "User-initiated account deletion");
    Ok(Json(DeleteAccountResponse {
        success: true,
        message: "Account deleted".to_string(),
    }))
}
