// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use serde::Serialize;

/// Advisory message shown on the dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    pub id: String,
    /// `weather`, `calendar`, `clothing` or `general`
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub description: String,
    /// `high`, `medium` or `low`
    pub priority: String,
    pub action: String,
}
