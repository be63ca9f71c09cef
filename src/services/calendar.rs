// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Google Calendar client and calendar grant management.

use crate::config::Config;
use crate::db::TokenStore;
use crate::error::AppError;
use crate::models::{CalendarEvent, CalendarSyncRequest, CalendarSyncResponse, CalendarToken};
use crate::services::google_oauth::{
    check_response_json, GoogleOAuthClient, OAuthToken, CALENDAR_SCOPES,
};
use crate::time_utils::format_utc_rfc3339;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use dashmap::DashMap;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

pub const DEFAULT_MAX_RESULTS: u32 = 50;
pub const MAX_RESULTS_LIMIT: u32 = 250;
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Shared refresh locks, one per user.
pub type RefreshLocks = Arc<DashMap<String, Arc<Mutex<()>>>>;

// ─────────────────────────────────────────────────────────────────────────────
// Provider schema
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct GcalEventList {
    #[serde(default)]
    items: Vec<GcalEvent>,
}

#[derive(Debug, Deserialize)]
struct GcalEvent {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    start: Option<GcalEventTime>,
    #[serde(default)]
    end: Option<GcalEventTime>,
    #[serde(default)]
    attendees: Vec<GcalAttendee>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GcalEventTime {
    #[serde(default)]
    date_time: Option<DateTime<Utc>>,
    /// All-day events carry only a date
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
struct GcalAttendee {
    #[serde(default)]
    email: Option<String>,
}

impl GcalEventTime {
    /// Resolve to an instant; all-day dates map to midnight UTC.
    fn resolve(&self) -> Option<(DateTime<Utc>, bool)> {
        if let Some(dt) = self.date_time {
            return Some((dt, false));
        }
        self.date
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| (naive.and_utc(), true))
    }
}

impl GcalEvent {
    /// Normalize; `None` for events without a usable start.
    fn into_event(self) -> Option<CalendarEvent> {
        let (start, all_day) = self.start.as_ref()?.resolve()?;
        let end = self
            .end
            .as_ref()
            .and_then(GcalEventTime::resolve)
            .map(|(end, _)| end)
            .unwrap_or(start);

        Some(CalendarEvent {
            id: self.id,
            summary: self.summary.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            location: self.location.unwrap_or_default(),
            start,
            end,
            all_day,
            attendees: self.attendees.into_iter().filter_map(|a| a.email).collect(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// GoogleCalendarClient
// ─────────────────────────────────────────────────────────────────────────────

/// Google Calendar API client.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleCalendarClient {
    pub fn new(base_url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// List single (expanded) events of the primary calendar ordered by start.
    pub async fn list_events(
        &self,
        access_token: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        let url = format!("{}/calendars/primary/events", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[
                ("timeMin", format_utc_rfc3339(time_min)),
                ("timeMax", format_utc_rfc3339(time_max)),
                ("maxResults", max_results.to_string()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ])
            .send()
            .await
            .map_err(|e| AppError::ProviderUnavailable(format!("Calendar request failed: {}", e)))?;

        let list: GcalEventList = check_response_json(response).await?;
        Ok(list
            .items
            .into_iter()
            .filter_map(GcalEvent::into_event)
            .collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// CalendarService
// ─────────────────────────────────────────────────────────────────────────────

/// Whether a user has a calendar grant.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarStatus {
    pub has_access: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Calendar component: grant lifecycle, token refresh and event listing.
#[derive(Clone)]
pub struct CalendarService {
    oauth: GoogleOAuthClient,
    client: GoogleCalendarClient,
    tokens: Arc<dyn TokenStore>,
    /// Per-user mutex to serialize token refresh operations.
    refresh_locks: RefreshLocks,
    redirect_uri: String,
}

impl CalendarService {
    pub fn new(
        config: &Config,
        oauth: GoogleOAuthClient,
        tokens: Arc<dyn TokenStore>,
        refresh_locks: RefreshLocks,
    ) -> Self {
        Self {
            oauth,
            client: GoogleCalendarClient::new(config.calendar_api_url.clone()),
            tokens,
            refresh_locks,
            redirect_uri: config.calendar_redirect_url.clone(),
        }
    }

    /// Consent-screen URL for the calendar grant.
    pub fn authorization_url(&self, state: &str) -> String {
        self.oauth
            .authorization_url(&self.redirect_uri, CALENDAR_SCOPES, state)
    }

    /// Exchange a calendar authorization code.
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<OAuthToken, AppError> {
        self.oauth.exchange_code(code, &self.redirect_uri).await
    }

    /// Store the grant for `user_id`, replacing any previous one.
    ///
    /// Google omits the refresh token on some re-consents; the stored one is
    /// kept in that case.
    pub async fn save_token(
        &self,
        user_id: &str,
        token: &OAuthToken,
    ) -> Result<CalendarToken, AppError> {
        let now = Utc::now();
        let previous = self.tokens.get_token(user_id).await?;

        let refresh_token = token
            .refresh_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| previous.as_ref().map(|p| p.refresh_token.clone()))
            .unwrap_or_default();

        let stored = CalendarToken {
            user_id: user_id.to_string(),
            access_token: token.access_token.clone(),
            refresh_token,
            token_type: token.token_type.clone(),
            expiry: token.expiry(now),
            scope: token
                .scope
                .clone()
                .or_else(|| previous.as_ref().map(|p| p.scope.clone()))
                .unwrap_or_default(),
            created_at: previous.as_ref().map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        };

        self.tokens.set_token(&stored).await?;
        Ok(stored)
    }

    /// Exchange a code and store the resulting grant.
    pub async fn connect(&self, user_id: &str, code: &str) -> Result<CalendarToken, AppError> {
        let token = self.exchange_code_for_token(code).await?;
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        let stored = self.save_token(user_id, &token).await?;
        tracing::info!(user_id, "Calendar connected");
        Ok(stored)
    }

    pub async fn status(&self, user_id: &str) -> Result<CalendarStatus, AppError> {
        let token = self.tokens.get_token(user_id).await?;
        Ok(CalendarStatus {
            has_access: token.is_some(),
            expires_at: token.map(|t| t.expiry),
        })
    }

    /// Remove the grant. Succeeds when none exists.
    /// Delete the grant. Waits for an in-flight refresh so the refreshed
    /// token cannot be written back afterwards.
    pub async fn disconnect(&self, user_id: &str) -> Result<(), AppError> {
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;
        self.tokens.delete_token(user_id).await?;
        tracing::info!(user_id, "Calendar disconnected");
        Ok(())
    }

    /// Events in `[time_min, time_max)`. `NotConnected` without a grant.
    pub async fn list_events(
        &self,
        user_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: u32,
    ) -> Result<Vec<CalendarEvent>, AppError> {
        let access_token = self.get_valid_access_token(user_id).await?;
        self.client
            .list_events(
                &access_token,
                time_min,
                time_max,
                clamp_max_results(max_results),
            )
            .await
    }

    /// List events for an optional window (defaults: now .. now + 30 days).
    pub async fn sync(
        &self,
        user_id: &str,
        request: CalendarSyncRequest,
    ) -> Result<CalendarSyncResponse, AppError> {
        let now = Utc::now();
        let time_min = request.time_min.unwrap_or(now);
        let time_max = request
            .time_max
            .unwrap_or(time_min + Duration::days(DEFAULT_WINDOW_DAYS));
        if time_max <= time_min {
            return Err(AppError::BadRequest(
                "time_max must be after time_min".to_string(),
            ));
        }

        let events = self
            .list_events(
                user_id,
                time_min,
                time_max,
                request.max_results.unwrap_or(DEFAULT_MAX_RESULTS),
            )
            .await?;

        tracing::info!(user_id, count = events.len(), "Calendar synced");
        Ok(CalendarSyncResponse {
            success: true,
            total: events.len(),
            events,
            synced_at: now,
        })
    }

    // ─── Token Management ────────────────────────────────────────────────────

    /// Get a valid (non-expiring) access token, refreshing it if needed.
    async fn get_valid_access_token(&self, user_id: &str) -> Result<String, AppError> {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);

        let token = self
            .tokens
            .get_token(user_id)
            .await?
            .ok_or(AppError::NotConnected)?;
        if Utc::now() + margin < token.expiry {
            return Ok(token.access_token);
        }

        // Only one task per user performs the refresh.
        let lock = self.user_lock(user_id);
        let _guard = lock.lock().await;

        // Another task may have refreshed while we were waiting.
        let token = self
            .tokens
            .get_token(user_id)
            .await?
            .ok_or(AppError::NotConnected)?;
        if Utc::now() + margin < token.expiry {
            return Ok(token.access_token);
        }

        if token.refresh_token.is_empty() {
            tracing::warn!(user_id, "Calendar token expired without refresh token");
            return Err(AppError::NotConnected);
        }

        tracing::info!(user_id, "Refreshing calendar access token");
        let refreshed = match self.oauth.refresh_token(&token.refresh_token).await {
            Ok(refreshed) => refreshed,
            Err(AppError::InvalidGrant) => {
                // Grant revoked at Google; the user has to connect again.
                tracing::warn!(user_id, "Calendar refresh token rejected, dropping grant");
                self.tokens.delete_token(user_id).await?;
                return Err(AppError::NotConnected);
            }
            Err(e) => return Err(e),
        };

        // Never resurrect a grant removed while the provider call was out.
        if self.tokens.get_token(user_id).await?.is_none() {
            return Err(AppError::NotConnected);
        }
        let stored = self.save_token(user_id, &refreshed).await?;
        Ok(stored.access_token)
    }

    /// Per-user lock serializing token refresh, connect and disconnect.
    fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        self.refresh_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn clamp_max_results(max_results: u32) -> u32 {
    max_results.clamp(1, MAX_RESULTS_LIMIT)
}
