// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Weather Companion: weather, calendar and recommendations behind one API
//!
//! This crate provides the backend API that signs users in with Google,
//! serves normalized OpenWeatherMap data and reads their Google Calendar.

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod maintenance;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use cache::Cache;
use config::Config;
use db::{TokenStore, UserStore};
use middleware::RateLimiter;
use services::{AuthService, CalendarService, GoogleOAuthClient, SessionManager, WeatherService};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub cache: Arc<dyn Cache>,
    pub sessions: SessionManager,
    pub auth_service: AuthService,
    pub weather_service: WeatherService,
    pub calendar_service: CalendarService,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wire services on top of the given stores.
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        cache: Arc<dyn Cache>,
    ) -> Self {
        let sessions = SessionManager::new(&config.jwt_signing_key, config.session_ttl);
        let oauth = GoogleOAuthClient::new(&config);

        let auth_service =
            AuthService::new(&config, oauth.clone(), users.clone(), sessions.clone());
        let weather_service = WeatherService::new(&config, cache.clone());
        let calendar_service = CalendarService::new(
            &config,
            oauth,
            tokens.clone(),
            Arc::new(dashmap::DashMap::new()),
        );
        let rate_limiter = RateLimiter::new(config.rate_limit_requests, config.rate_limit_window);

        Self {
            config,
            users,
            tokens,
            cache,
            sessions,
            auth_service,
            weather_service,
            calendar_service,
            rate_limiter,
        }
    }
}
