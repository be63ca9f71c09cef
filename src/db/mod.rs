// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storage layer: user and calendar-token stores.
//!
//! Handlers only see the [`UserStore`] and [`TokenStore`] traits. The
//! in-memory [`MemoryDb`] backs local development and tests; [`FirestoreDb`]
//! is used when a GCP project is configured.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::MemoryDb;

use crate::error::AppError;
use crate::models::{CalendarToken, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Collection names as constants.
pub mod collections {
    pub const USERS: &str = "users";
    /// Calendar grants (keyed by user_id)
    pub const CALENDAR_TOKENS: &str = "calendar_tokens";
}

/// Persistence for user records.
///
/// `(provider, provider_id)` and `email` are unique across all users,
/// including soft-deleted ones.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a live (not soft-deleted) user by ID.
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Find a user by provider identity, including soft-deleted users.
    async fn find_by_provider_id(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, AppError>;

    /// Insert a new user. Fails with `Conflict` on a uniqueness violation.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;

    /// Overwrite an existing user.
    async fn update_user(&self, user: &User) -> Result<(), AppError>;

    /// Mark a user deleted. The record is kept.
    async fn soft_delete_user(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> Result<(), AppError>;
}

/// Persistence for calendar grants (one per user).
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn get_token(&self, user_id: &str) -> Result<Option<CalendarToken>, AppError>;

    /// Create or replace the grant for `token.user_id`.
    /// Fails with `NotFound` when the user does not exist.
    async fn set_token(&self, token: &CalendarToken) -> Result<(), AppError>;

    /// Delete the grant; succeeds when none exists.
    async fn delete_token(&self, user_id: &str) -> Result<(), AppError>;
}
