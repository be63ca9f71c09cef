// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar grant and event models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's Google Calendar OAuth grant (one per user).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarToken {
    /// Owning user ID (also used as document ID)
    pub user_id: String,
    pub access_token: String,
    /// May be empty when the provider did not issue one
    pub refresh_token: String,
    pub token_type: String,
    pub expiry: DateTime<Utc>,
    pub scope: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Calendar event normalized from the provider's event resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarEvent {
    pub id: String,
    pub summary: String,
    pub description: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<String>,
}

/// Optional window for `POST /calendar/sync`.
#[derive(Debug, Default, Deserialize)]
pub struct CalendarSyncRequest {
    pub time_min: Option<DateTime<Utc>>,
    pub time_max: Option<DateTime<Utc>>,
    pub max_results: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CalendarSyncResponse {
    pub success: bool,
    pub events: Vec<CalendarEvent>,
    pub total: usize,
    pub synced_at: DateTime<Utc>,
}
