// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weather routes.

use crate::error::{AppError, Result};
use crate::models::{Forecast, GeocodeResults, HourlyForecast, Units, WeatherSnapshot};
use crate::routes::DataResponse;
use crate::AppState;
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/weather/current", get(current))
        .route("/weather/forecast", get(forecast))
        .route("/weather/hourly", get(hourly))
        .route("/weather/geocode", get(geocode))
}

/// Hours covered by `/weather/hourly` when the query names none.
const DEFAULT_HOURS: u32 = 24;
/// The provider publishes 40 samples, five days at 3-hour steps.
const MAX_HOURS: u32 = 120;
const DEFAULT_PLACES: u32 = 5;
const MAX_PLACES: u32 = 10;
const MAX_PLACE_QUERY_LEN: usize = 100;

/// Raw query; parsed by hand so every problem is a 400 with a message.
#[derive(Debug, Default, Deserialize)]
pub struct WeatherQuery {
    lat: Option<String>,
    lon: Option<String>,
    units: Option<String>,
    hours: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GeocodeQuery {
    q: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Location {
    lat: f64,
    lon: f64,
    units: Units,
}

fn parse_coordinate(name: &str, raw: Option<&str>, limit: f64) -> Result<f64> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing required parameter: {}", name)))?;
    let value: f64 = raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", name, raw)))?;
    if !value.is_finite() || value.abs() > limit {
        return Err(AppError::BadRequest(format!(
            "{} must be between -{} and {}",
            name, limit, limit
        )));
    }
    Ok(value)
}

/// Optional integer parameter in `1..=max`.
fn parse_count(name: &str, raw: Option<&str>, default: u32, max: u32) -> Result<u32> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(default);
    };
    match raw.parse::<u32>() {
        Ok(value) if (1..=max).contains(&value) => Ok(value),
        _ => Err(AppError::BadRequest(format!(
            "{} must be an integer between 1 and {}",
            name, max
        ))),
    }
}

/// Number of 3-hour samples needed to cover `hours`.
fn samples_for_hours(hours: u32) -> u32 {
    hours.div_ceil(3)
}

impl GeocodeQuery {
    fn parse(&self) -> Result<(String, u32)> {
        let q = self
            .q
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing required parameter: q".to_string()))?;
        if q.chars().count() > MAX_PLACE_QUERY_LEN {
            return Err(AppError::BadRequest(format!(
                "q must be at most {} characters",
                MAX_PLACE_QUERY_LEN
            )));
        }
        let limit = parse_count("limit", self.limit.as_deref(), DEFAULT_PLACES, MAX_PLACES)?;
        Ok((q.to_string(), limit))
    }
}

impl WeatherQuery {
    fn parse(&self) -> Result<Location> {
        let lat = parse_coordinate("lat", self.lat.as_deref(), 90.0)?;
        let lon = parse_coordinate("lon", self.lon.as_deref(), 180.0)?;
        let units = match self.units.as_deref().map(str::trim) {
            None | Some("") => Units::default(),
            Some(raw) => raw.parse().map_err(AppError::BadRequest)?,
        };
        Ok(Location { lat, lon, units })
    }
}

fn parse_query(query: std::result::Result<Query<WeatherQuery>, QueryRejection>) -> Result<Location> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    query.parse()
}

/// Current conditions for a coordinate pair.
async fn current(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<DataResponse<WeatherSnapshot>>> {
    let loc = parse_query(query)?;
    let snapshot = state
        .weather_service
        .get_current(loc.lat, loc.lon, loc.units)
        .await?;
    Ok(Json(DataResponse::ok(snapshot)))
}

/// Five-day forecast for a coordinate pair.
async fn forecast(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<DataResponse<Forecast>>> {
    let loc = parse_query(query)?;
    let forecast = state
        .weather_service
        .get_forecast(loc.lat, loc.lon, loc.units)
        .await?;
    Ok(Json(DataResponse::ok(forecast)))
}

/// Upcoming 3-hour samples covering `hours` (default 24).
async fn hourly(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<WeatherQuery>, QueryRejection>,
) -> Result<Json<DataResponse<HourlyForecast>>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let loc = query.parse()?;
    let hours = parse_count("hours", query.hours.as_deref(), DEFAULT_HOURS, MAX_HOURS)?;
    let hourly = state
        .weather_service
        .get_hourly(loc.lat, loc.lon, loc.units, samples_for_hours(hours))
        .await?;
    Ok(Json(DataResponse::ok(hourly)))
}

/// Places matching a name, for picking a location without coordinates.
async fn geocode(
    State(state): State<Arc<AppState>>,
    query: std::result::Result<Query<GeocodeQuery>, QueryRejection>,
) -> Result<Json<DataResponse<GeocodeResults>>> {
    let Query(query) = query.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let (q, limit) = query.parse()?;
    let results = state.weather_service.search_places(&q, limit).await?;
    Ok(Json(DataResponse::ok(results)))
}
