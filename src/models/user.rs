// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! User model for storage and API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Default timezone assigned to new users.
pub const DEFAULT_TIMEZONE: &str = "America/Los_Angeles";

/// Measurement system for weather values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
        }
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metric" => Ok(Units::Metric),
            "imperial" => Ok(Units::Imperial),
            other => Err(format!(
                "Invalid units '{}': expected 'metric' or 'imperial'",
                other
            )),
        }
    }
}

/// User profile as persisted by a [`crate::db::UserStore`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// Opaque user ID (UUID v4, also used as document ID)
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub photo_url: Option<String>,
    /// OAuth provider name (`"google"`)
    pub provider: String,
    /// Subject ID issued by the provider
    pub provider_id: String,
    pub timezone: String,
    pub units: Units,
    pub notifications: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    /// Soft-delete marker; deleted users are invisible to lookups by ID.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Build a first-login user with default preferences.
    pub fn from_identity(identity: &ProviderIdentity, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email: identity.email.clone(),
            display_name: identity.name.clone(),
            photo_url: identity.picture.clone(),
            provider: identity.provider.clone(),
            provider_id: identity.subject.clone(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            units: Units::Imperial,
            notifications: true,
            created_at: now,
            updated_at: now,
            last_login: Some(now),
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Identity returned by the OAuth provider after a code exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderIdentity {
    pub provider: String,
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Mutable preferences accepted by `PUT /user/me`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub timezone: Option<String>,
    pub units: Option<Units>,
    pub notifications: Option<bool>,
}

impl UpdateUserRequest {
    /// Apply the present fields to `user`.
    pub fn apply_to(self, user: &mut User) {
        if let Some(name) = self.display_name {
            user.display_name = name;
        }
        if let Some(tz) = self.timezone {
            user.timezone = tz;
        }
        if let Some(units) = self.units {
            user.units = units;
        }
        if let Some(notifications) = self.notifications {
            user.notifications = notifications;
        }
    }
}
