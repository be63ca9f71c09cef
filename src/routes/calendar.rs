// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar routes.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{CalendarEvent, CalendarSyncRequest, CalendarSyncResponse};
use crate::routes::auth::{check_state, mint_state, AuthUrlResponse};
use crate::routes::bad_json;
use crate::services::calendar::{DEFAULT_MAX_RESULTS, DEFAULT_WINDOW_DAYS};
use crate::time_utils::format_utc_rfc3339;
use crate::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/calendar/auth", post(auth_url))
        .route("/calendar/connect", post(connect))
        .route("/calendar/status", get(status))
        .route("/calendar/events", get(events))
        .route("/calendar/sync", post(sync))
        .route("/calendar/disconnect", delete(disconnect))
}

// ─── Connect / Status ────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct ConnectRequest {
    #[validate(length(min = 1))]
    code: String,
    /// Echoed from the consent redirect; verified when present
    #[serde(default)]
    state: Option<String>,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CalendarStatusResponse {
    pub has_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

/// Consent URL for the calendar read scope.
async fn auth_url(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<AuthUrlResponse>> {
    let oauth_state = mint_state(&state.config.jwt_signing_key)?;
    tracing::info!(user_id = %auth.user_id, "Starting calendar consent flow");
    Ok(Json(AuthUrlResponse {
        url: state.calendar_service.authorization_url(&oauth_state),
    }))
}

/// Exchange a calendar authorization code and store the grant.
async fn connect(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: std::result::Result<Json<ConnectRequest>, JsonRejection>,
) -> Result<Json<CalendarStatusResponse>> {
    let Json(request) = body.map_err(bad_json)?;
    request
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    if let Some(oauth_state) = request.state.as_deref() {
        check_state(&state.config.jwt_signing_key, oauth_state)?;
    }

    let token = state
        .calendar_service
        .connect(&auth.user_id, &request.code)
        .await?;

    Ok(Json(CalendarStatusResponse {
        has_access: true,
        expires_at: Some(format_utc_rfc3339(token.expiry)),
    }))
}

async fn status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<CalendarStatusResponse>> {
    let status = state.calendar_service.status(&auth.user_id).await?;
    Ok(Json(CalendarStatusResponse {
        has_access: status.has_access,
        expires_at: status.expires_at.map(format_utc_rfc3339),
    }))
}

// ─── Events ──────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    time_min: Option<String>,
    time_max: Option<String>,
    max_results: Option<String>,
}

#[derive(Debug, PartialEq)]
struct EventWindow {
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
    max_results: u32,
}

fn parse_time(name: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| AppError::BadRequest(format!("{} must be an RFC 3339 timestamp", name))),
    }
}

impl EventsQuery {
    fn parse(&self, now: DateTime<Utc>) -> Result<EventWindow> {
        let time_min = parse_time("time_min", self.time_min.as_deref())?.unwrap_or(now);
        let time_max = parse_time("time_max", self.time_max.as_deref())?
            .unwrap_or(time_min + Duration::days(DEFAULT_WINDOW_DAYS));
        if time_max <= time_min {
            return Err(AppError::BadRequest(
                "time_max must be after time_min".to_string(),
            ));
        }

        let max_results = match self.max_results.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_MAX_RESULTS,
            Some(raw) => raw.parse().map_err(|_| {
                AppError::BadRequest(format!("Invalid max_results: {}", raw))
            })?,
        };

        Ok(EventWindow {
            time_min,
            time_max,
            max_results,
        })
    }
}

#[derive(Serialize)]
pub struct EventsResponse {
    pub success: bool,
    pub events: Vec<CalendarEvent>,
    pub total: usize,
}

/// Events of the primary calendar in a time window.
async fn events(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    query: std::result::Result<Query<EventsQuery>, QueryRejection>,
) -> Result<Json<EventsResponse>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let window = query.parse(Utc::now())?;

    let events = state
        .calendar_service
        .list_events(
            &auth.user_id,
            window.time_min,
            window.time_max,
            window.max_results,
        )
        .await?;

    Ok(Json(EventsResponse {
        success: true,
        total: events.len(),
        events,
    }))
}

/// Fetch events for an optional window given as a JSON body.
async fn sync(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    body: Bytes,
) -> Result<Json<CalendarSyncResponse>> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        CalendarSyncRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid sync request: {}", e)))?
    };

    let response = state.calendar_service.sync(&auth.user_id, request).await?;
    Ok(Json(response))
}

#[derive(Serialize)]
pub struct DisconnectResponse {
    pub success: bool,
    pub message: String,
}

async fn disconnect(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<DisconnectResponse>> {
    state.calendar_service.disconnect(&auth.user_id).await?;
    Ok(Json(DisconnectResponse {
        success: true,
        message: "Calendar disconnected".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(min: Option<&str>, max: Option<&str>, n: Option<&str>) -> EventsQuery {
        EventsQuery {
            time_min: min.map(str::to_string),
            time_max: max.map(str::to_string),
            max_results: n.map(str::to_string),
        }
    }

    #[test]
    fn test_defaults_to_thirty_days_from_now() {
        let now = Utc::now();
        let window = query(None, None, None).parse(now).unwrap();
        assert_eq!(window.time_min, now);
        assert_eq!(window.time_max, now + Duration::days(30));
        assert_eq!(window.max_results, DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn test_parses_offsets_to_utc() {
        let window = query(
            Some("2026-07-01T00:00:00-07:00"),
            Some("2026-07-02T00:00:00Z"),
            Some("10"),
        )
        .parse(Utc::now())
        .unwrap();
        assert_eq!(format_utc_rfc3339(window.time_min), "2026-07-01T07:00:00Z");
        assert_eq!(window.max_results, 10);
    }

    #[test]
    fn test_rejects_bad_input() {
        let now = Utc::now();
        assert!(query(Some("yesterday"), None, None).parse(now).is_err());
        assert!(query(
            Some("2026-07-02T00:00:00Z"),
            Some("2026-07-01T00:00:00Z"),
            None
        )
        .parse(now)
        .is_err());
        assert!(query(None, None, Some("lots")).parse(now).is_err());
        assert!(query(None, None, Some("-1")).parse(now).is_err());
    }
}
