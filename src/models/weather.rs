// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Normalized weather models served to clients (cache-only, never persisted).

use super::Units;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current conditions for a coordinate pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeatherSnapshot {
    pub location: String,
    pub latitude: f64,
    pub longitude: f64,
    pub units: Units,
    pub temperature: f64,
    pub feels_like: f64,
    pub condition: String,
    pub icon: String,
    pub humidity: u32,
    pub wind_speed: f64,
    /// 16-point compass direction
    pub wind_direction: String,
    /// inHg for imperial, hPa otherwise
    pub pressure: f64,
    pub timestamp: DateTime<Utc>,
    /// Placeholder data served because no provider key is configured.
    pub degraded: bool,
}

/// One bucketed forecast day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastDay {
    /// Local calendar date, `YYYY-MM-DD`
    pub date: String,
    pub day_name: String,
    pub high_temp: f64,
    pub low_temp: f64,
    pub condition: String,
    pub icon: String,
    pub humidity: u32,
    pub wind_speed: f64,
    pub wind_direction: String,
    pub pressure: f64,
    /// Probability of precipitation, 0-100
    pub precipitation: u32,
}

/// Up to five forecast days for a coordinate pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Forecast {
    pub location: String,
    pub units: Units,
    pub days: Vec<ForecastDay>,
    pub degraded: bool,
}

/// The next few 3-hour samples, each normalized like current conditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HourlyForecast {
    pub location: String,
    pub units: Units,
    pub samples: Vec<WeatherSnapshot>,
    pub degraded: bool,
}

/// A place matched by name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeoPlace {
    pub name: String,
    pub state: Option<String>,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
    /// `"<city>, <state>, <country>"`
    pub label: String,
}

/// Forward geocoding results for a free-text query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeocodeResults {
    pub query: String,
    pub places: Vec<GeoPlace>,
    pub degraded: bool,
}
