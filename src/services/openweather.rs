// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OpenWeatherMap API client.
//!
//! Responses are decoded into explicit schema types; a payload that does not
//! match is an upstream error rather than a partially filled snapshot.

use crate::config::Config;
use crate::error::AppError;
use crate::models::Units;
use crate::services::google_oauth::check_response_json;
use serde::Deserialize;

/// `main` block shared by current and forecast responses.
#[derive(Debug, Clone, Deserialize)]
pub struct OwmMain {
    pub temp: f64,
    pub feels_like: f64,
    pub humidity: u32,
    /// hPa
    pub pressure: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwmCondition {
    pub main: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OwmWind {
    pub speed: f64,
    /// Bearing in degrees
    #[serde(default)]
    pub deg: f64,
}

/// `GET /weather` response.
#[derive(Debug, Clone, Deserialize)]
pub struct OwmCurrent {
    #[serde(default)]
    pub name: String,
    pub main: OwmMain,
    #[serde(default)]
    pub weather: Vec<OwmCondition>,
    #[serde(default)]
    pub wind: OwmWind,
    pub dt: i64,
}

/// One 3-hour sample of `GET /forecast`.
#[derive(Debug, Clone, Deserialize)]
pub struct OwmForecastItem {
    pub dt: i64,
    pub main: OwmMain,
    #[serde(default)]
    pub weather: Vec<OwmCondition>,
    #[serde(default)]
    pub wind: OwmWind,
    /// Probability of precipitation, 0.0-1.0
    #[serde(default)]
    pub pop: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OwmCity {
    #[serde(default)]
    pub name: String,
    /// Shift from UTC in seconds
    #[serde(default)]
    pub timezone: i64,
}

/// `GET /forecast` response.
#[derive(Debug, Clone, Deserialize)]
pub struct OwmForecast {
    pub list: Vec<OwmForecastItem>,
    pub city: OwmCity,
}

/// One `GET /reverse` or `GET /direct` result.
#[derive(Debug, Clone, Deserialize)]
pub struct OwmPlace {
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    pub country: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
}

impl OwmPlace {
    /// `"<city>, <state>, <country>"`, skipping an absent state.
    pub fn label(&self) -> String {
        match self.state.as_deref().filter(|s| !s.is_empty()) {
            Some(state) => format!("{}, {}, {}", self.name, state, self.country),
            None => format!("{}, {}", self.name, self.country),
        }
    }
}

/// OpenWeatherMap client.
#[derive(Clone)]
pub struct OpenWeatherClient {
    http: reqwest::Client,
    api_key: String,
    weather_url: String,
    geocode_url: String,
}

impl OpenWeatherClient {
    pub fn new(config: &Config, api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            weather_url: config.weather_api_url.clone(),
            geocode_url: config.geocode_api_url.clone(),
        }
    }

    pub async fn current(&self, lat: f64, lon: f64, units: Units) -> Result<OwmCurrent, AppError> {
        let url = format!("{}/weather", self.weather_url);
        self.get_json(&url, lat, lon, &[("units", units.as_str().to_string())])
            .await
    }

    pub async fn forecast(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<OwmForecast, AppError> {
        let url = format!("{}/forecast", self.weather_url);
        self.get_json(&url, lat, lon, &[("units", units.as_str().to_string())])
            .await
    }

    /// The first `count` 3-hour forecast samples.
    pub async fn forecast_samples(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
        count: u32,
    ) -> Result<OwmForecast, AppError> {
        let url = format!("{}/forecast", self.weather_url);
        self.get_json(
            &url,
            lat,
            lon,
            &[
                ("units", units.as_str().to_string()),
                ("cnt", count.to_string()),
            ],
        )
        .await
    }

    /// Places whose name matches `query`, best match first.
    pub async fn direct_geocode(&self, query: &str, limit: u32) -> Result<Vec<OwmPlace>, AppError> {
        let url = format!("{}/direct", self.geocode_url);
        self.request(&url, &[("q", query.to_string()), ("limit", limit.to_string())])
            .await
    }

    /// Nearest named place, if any.
    pub async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Option<OwmPlace>, AppError> {
        let url = format!("{}/reverse", self.geocode_url);
        let places: Vec<OwmPlace> = self
            .get_json(&url, lat, lon, &[("limit", "1".to_string())])
            .await?;
        Ok(places.into_iter().next())
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        lat: f64,
        lon: f64,
        extra: &[(&str, String)],
    ) -> Result<T, AppError> {
        let mut params = vec![("lat", lat.to_string()), ("lon", lon.to_string())];
        params.extend_from_slice(extra);
        self.request(url, &params).await
    }

    async fn request<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, AppError> {
        let response = self
            .http
            .get(url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                AppError::ProviderUnavailable(format!("Weather request failed: {}", e))
            })?;

        check_response_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_label() {
        let place = OwmPlace {
            name: "Palo Alto".to_string(),
            state: Some("California".to_string()),
            country: "US".to_string(),
            lat: 37.44,
            lon: -122.14,
        };
        assert_eq!(place.label(), "Palo Alto, California, US");

        let place = OwmPlace {
            name: "Paris".to_string(),
            state: None,
            country: "FR".to_string(),
            lat: 48.86,
            lon: 2.35,
        };
        assert_eq!(place.label(), "Paris, FR");
    }

    #[test]
    fn test_direct_place_carries_coordinates() {
        let raw = r#"[{"name":"Springfield","state":"Illinois","country":"US","lat":39.78,"lon":-89.65,"local_names":{"en":"Springfield"}}]"#;
        let places: Vec<OwmPlace> = serde_json::from_str(raw).unwrap();
        assert_eq!(places[0].lat, 39.78);
        assert_eq!(places[0].label(), "Springfield, Illinois, US");
    }

    #[test]
    fn test_current_schema_mismatch_is_an_error() {
        let raw = r#"{"name":"X","main":{"temp":"warm"},"dt":0}"#;
        assert!(serde_json::from_str::<OwmCurrent>(raw).is_err());
    }
}
