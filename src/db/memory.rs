// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process store used for local development and tests.

use super::{TokenStore, UserStore};
use crate::error::AppError;
use crate::models::{CalendarToken, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    users: DashMap<String, User>,
    /// (provider, provider_id) -> user ID
    identities: DashMap<(String, String), String>,
    /// email -> user ID
    emails: DashMap<String, String>,
    /// user ID -> grant
    tokens: DashMap<String, CalendarToken>,
}

/// Memory-backed [`UserStore`] and [`TokenStore`].
///
/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryDb {
    tables: Arc<Tables>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of user rows, including soft-deleted ones.
    pub fn user_count(&self) -> usize {
        self.tables.users.len()
    }

    /// Reserve `email` for `user_id`, failing if another user holds it.
    fn claim_email(&self, email: &str, user_id: &str) -> Result<(), AppError> {
        match self.tables.emails.entry(email.to_string()) {
            Entry::Occupied(e) if e.get() != user_id => Err(AppError::Conflict(format!(
                "Email {} is already registered",
                email
            ))),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(e) => {
                e.insert(user_id.to_string());
                Ok(())
            }
        }
    }
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .tables
            .users
            .get(id)
            .map(|u| u.clone())
            .filter(|u| !u.is_deleted()))
    }

    async fn find_by_provider_id(
        &self,
        provider: &str,
        provider_id: &str,
    ) -> Result<Option<User>, AppError> {
        let key = (provider.to_string(), provider_id.to_string());
        let Some(id) = self.tables.identities.get(&key).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.tables.users.get(&id).map(|u| u.clone()))
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let key = (user.provider.clone(), user.provider_id.clone());
        match self.tables.identities.entry(key) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "User for {} identity {} already exists",
                user.provider, user.provider_id
            ))),
            Entry::Vacant(slot) => {
                self.claim_email(&user.email, &user.id)?;
                slot.insert(user.id.clone());
                self.tables.users.insert(user.id.clone(), user.clone());
                Ok(())
            }
        }
    }

    async fn update_user(&self, user: &User) -> Result<(), AppError> {
        let previous_email = match self.tables.users.get(&user.id) {
            Some(existing) => {
                if existing.provider != user.provider || existing.provider_id != user.provider_id {
                    return Err(AppError::Conflict(
                        "Provider identity cannot be changed".to_string(),
                    ));
                }
                existing.email.clone()
            }
            None => return Err(AppError::NotFound(format!("User {} not found", user.id))),
        };

        if previous_email != user.email {
            self.claim_email(&user.email, &user.id)?;
            self.tables.emails.remove(&previous_email);
        }

        self.tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn soft_delete_user(&self, id: &str, at: DateTime<Utc>) -> Result<(), AppError> {
        match self.tables.users.get_mut(id) {
            Some(mut user) => {
                user.deleted_at = Some(at);
                user.updated_at = at;
                Ok(())
            }
            None => Err(AppError::NotFound(format!("User {} not found", id))),
        }
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

#[async_trait]
impl TokenStore for MemoryDb {
    async fn get_token(&self, user_id: &str) -> Result<Option<CalendarToken>, AppError> {
        Ok(self.tables.tokens.get(user_id).map(|t| t.clone()))
    }

    async fn set_token(&self, token: &CalendarToken) -> Result<(), AppError> {
        let user_exists = self
            .tables
            .users
            .get(&token.user_id)
            .is_some_and(|u| !u.is_deleted());
        if !user_exists {
            return Err(AppError::NotFound(format!(
                "User {} not found",
                token.user_id
            )));
        }

        self.tables
            .tokens
            .insert(token.user_id.clone(), token.clone());
        Ok(())
    }

    async fn delete_token(&self, user_id: &str) -> Result<(), AppError> {
        self.tables.tokens.remove(user_id);
        Ok(())
    }
}
