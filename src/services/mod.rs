// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod calendar;
pub mod forecast;
pub mod google_oauth;
pub mod openweather;
pub mod recommendation;
pub mod session;
pub mod weather;

pub use auth::{AuthService, LoginResult};
pub use calendar::{CalendarService, CalendarStatus, GoogleCalendarClient, RefreshLocks};
pub use google_oauth::{GoogleOAuthClient, OAuthToken};
pub use openweather::OpenWeatherClient;
pub use session::{SessionClaims, SessionManager};
pub use weather::WeatherService;
