// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod calendar;
pub mod recommendation;
pub mod user;
pub mod weather;

pub use calendar::{CalendarEvent, CalendarSyncRequest, CalendarSyncResponse, CalendarToken};
pub use recommendation::Recommendation;
pub use user::{ProviderIdentity, UpdateUserRequest, Units, User};
pub use weather::{
    Forecast, ForecastDay, GeoPlace, GeocodeResults, HourlyForecast, WeatherSnapshot,
};
