// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Weather component: cached current conditions, forecast and location labels.
//!
//! Without an API key the service runs degraded: it answers with fixed
//! placeholder data flagged `degraded: true`, never calls the provider and
//! never caches.

use crate::cache::{get_json, set_json, Cache};
use crate::config::Config;
use crate::error::AppError;
use crate::models::{
    Forecast, ForecastDay, GeoPlace, GeocodeResults, HourlyForecast, Units, WeatherSnapshot,
};
use crate::services::forecast::{bucket_forecast, normalize_pressure, wind_direction};
use crate::services::openweather::{OpenWeatherClient, OwmCondition, OwmMain, OwmWind};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

const STANDARD_PRESSURE_HPA: f64 = 1013.0;

pub fn current_key(lat: f64, lon: f64, units: Units) -> String {
    format!("weather:current:{:.3}:{:.3}:{}", lat, lon, units)
}

pub fn forecast_key(lat: f64, lon: f64, units: Units) -> String {
    format!("weather:forecast:{:.3}:{:.3}:{}", lat, lon, units)
}

pub fn hourly_key(lat: f64, lon: f64, units: Units, samples: u32) -> String {
    format!("weather:hourly:{:.3}:{:.3}:{}:{}", lat, lon, units, samples)
}

/// Queries differing only in case or surrounding space share an entry.
pub fn place_search_key(query: &str, limit: u32) -> String {
    format!("geocode:direct:{}:{}", query.trim().to_lowercase(), limit)
}

pub fn geocode_key(lat: f64, lon: f64) -> String {
    format!("geocode:{:.3}:{:.3}", lat, lon)
}

/// Label used when reverse geocoding yields nothing.
pub fn coordinate_label(lat: f64, lon: f64) -> String {
    format!("Lat: {:.2}, Lon: {:.2}", lat, lon)
}

#[derive(Clone)]
pub struct WeatherService {
    /// `None` when no API key is configured.
    client: Option<OpenWeatherClient>,
    cache: Arc<dyn Cache>,
    weather_ttl: Duration,
    forecast_ttl: Duration,
    geocode_ttl: Duration,
}

impl WeatherService {
    pub fn new(config: &Config, cache: Arc<dyn Cache>) -> Self {
        let client = config
            .weather_api_key
            .clone()
            .map(|key| OpenWeatherClient::new(config, key));
        if client.is_none() {
            tracing::warn!("WEATHER_API_KEY not set, weather responses will be placeholders");
        }

        Self {
            client,
            cache,
            weather_ttl: config.weather_ttl,
            forecast_ttl: config.forecast_ttl,
            geocode_ttl: config.geocode_ttl,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.client.is_none()
    }

    /// Current conditions, served from cache within the TTL.
    pub async fn get_current(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<WeatherSnapshot, AppError> {
        let Some(client) = &self.client else {
            return Ok(placeholder_current(lat, lon, units, Utc::now()));
        };

        let key = current_key(lat, lon, units);
        if let Some(hit) = get_json::<WeatherSnapshot>(self.cache.as_ref(), &key).await {
            tracing::debug!(key = %key, "Weather cache hit");
            return Ok(hit);
        }

        let raw = client.current(lat, lon, units).await?;
        let location = self.location_label(client, lat, lon).await;
        let snapshot = Sample {
            main: &raw.main,
            weather: &raw.weather,
            wind: &raw.wind,
            dt: raw.dt,
        }
        .normalize(location, lat, lon, units);

        set_json(self.cache.as_ref(), &key, &snapshot, self.weather_ttl).await;
        Ok(snapshot)
    }

    /// Up to five local days of forecast, served from cache within the TTL.
    pub async fn get_forecast(&self, lat: f64, lon: f64, units: Units) -> Result<Forecast, AppError> {
        self.forecast_at(lat, lon, units, Utc::now()).await
    }

    async fn forecast_at(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
        now: DateTime<Utc>,
    ) -> Result<Forecast, AppError> {
        let Some(client) = &self.client else {
            return Ok(placeholder_forecast(lat, lon, units));
        };

        let key = forecast_key(lat, lon, units);
        if let Some(hit) = get_json::<CachedForecast>(self.cache.as_ref(), &key).await {
            tracing::debug!(key = %key, "Forecast cache hit");
            let mut forecast = hit.forecast;
            drop_past_days(&mut forecast.days, local_date(now, hit.utc_offset_secs));
            return Ok(forecast);
        }

        let raw = client.forecast(lat, lon, units).await?;
        let offset = raw.city.timezone;
        let days = bucket_forecast(&raw.list, offset, local_date(now, offset), units);
        let location = self.location_label(client, lat, lon).await;

        let cached = CachedForecast {
            utc_offset_secs: offset,
            forecast: Forecast {
                location,
                units,
                days,
                degraded: false,
            },
        };

        let ttl = ttl_within_local_day(now, offset, self.forecast_ttl);
        set_json(self.cache.as_ref(), &key, &cached, ttl).await;
        Ok(cached.forecast)
    }

    /// The next `samples` 3-hour forecast points, cached like the forecast.
    pub async fn get_hourly(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
        samples: u32,
    ) -> Result<HourlyForecast, AppError> {
        let Some(client) = &self.client else {
            return Ok(HourlyForecast {
                location: coordinate_label(lat, lon),
                units,
                samples: Vec::new(),
                degraded: true,
            });
        };

        let key = hourly_key(lat, lon, units, samples);
        if let Some(hit) = get_json::<HourlyForecast>(self.cache.as_ref(), &key).await {
            tracing::debug!(key = %key, "Hourly cache hit");
            return Ok(hit);
        }

        let raw = client.forecast_samples(lat, lon, units, samples).await?;
        let location = self.location_label(client, lat, lon).await;
        let hourly = HourlyForecast {
            samples: raw
                .list
                .iter()
                .take(samples as usize)
                .map(|item| {
                    Sample {
                        main: &item.main,
                        weather: &item.weather,
                        wind: &item.wind,
                        dt: item.dt,
                    }
                    .normalize(location.clone(), lat, lon, units)
                })
                .collect(),
            location,
            units,
            degraded: false,
        };

        set_json(self.cache.as_ref(), &key, &hourly, self.forecast_ttl).await;
        Ok(hourly)
    }

    /// Places matching a free-text name, cached per normalized query.
    pub async fn search_places(&self, query: &str, limit: u32) -> Result<GeocodeResults, AppError> {
        let query = query.trim();
        let Some(client) = &self.client else {
            return Ok(GeocodeResults {
                query: query.to_string(),
                places: Vec::new(),
                degraded: true,
            });
        };

        let key = place_search_key(query, limit);
        if let Some(hit) = get_json::<Vec<GeoPlace>>(self.cache.as_ref(), &key).await {
            tracing::debug!(key = %key, "Place search cache hit");
            return Ok(GeocodeResults {
                query: query.to_string(),
                places: hit,
                degraded: false,
            });
        }

        let places: Vec<GeoPlace> = client
            .direct_geocode(query, limit)
            .await?
            .into_iter()
            .map(|place| GeoPlace {
                label: place.label(),
                name: place.name,
                state: place.state,
                country: place.country,
                latitude: place.lat,
                longitude: place.lon,
            })
            .collect();
        tracing::debug!(query, count = places.len(), "Place search");

        set_json(self.cache.as_ref(), &key, &places, self.geocode_ttl).await;
        Ok(GeocodeResults {
            query: query.to_string(),
            places,
            degraded: false,
        })
    }

    /// Reverse-geocoded label. Failures degrade to a coordinate label, which
    /// is cached like a real one.
    async fn location_label(&self, client: &OpenWeatherClient, lat: f64, lon: f64) -> String {
        let key = geocode_key(lat, lon);
        if let Some(label) = self.cache.get(&key).await {
            return label;
        }

        let label = match client.reverse_geocode(lat, lon).await {
            Ok(Some(place)) => place.label(),
            Ok(None) => coordinate_label(lat, lon),
            Err(e) => {
                tracing::warn!(error = %e, lat, lon, "Reverse geocoding failed");
                coordinate_label(lat, lon)
            }
        };

        self.cache.set(&key, label.clone(), self.geocode_ttl).await;
        label
    }
}

/// Provider fields shared by current conditions and forecast samples.
struct Sample<'a> {
    main: &'a OwmMain,
    weather: &'a [OwmCondition],
    wind: &'a OwmWind,
    dt: i64,
}

impl Sample<'_> {
    fn normalize(&self, location: String, lat: f64, lon: f64, units: Units) -> WeatherSnapshot {
        let condition = self.weather.first();
        WeatherSnapshot {
            location,
            latitude: lat,
            longitude: lon,
            units,
            temperature: self.main.temp,
            feels_like: self.main.feels_like,
            condition: condition.map(|c| c.description.clone()).unwrap_or_default(),
            icon: condition.map(|c| c.icon.clone()).unwrap_or_default(),
            humidity: self.main.humidity,
            wind_speed: self.wind.speed,
            wind_direction: wind_direction(self.wind.deg).to_string(),
            pressure: normalize_pressure(self.main.pressure, units),
            timestamp: DateTime::from_timestamp(self.dt, 0).unwrap_or_else(Utc::now),
            degraded: false,
        }
    }
}

/// Cached forecast together with the offset its days were bucketed in.
#[derive(Serialize, Deserialize)]
struct CachedForecast {
    utc_offset_secs: i64,
    forecast: Forecast,
}

fn local_date(now: DateTime<Utc>, utc_offset_secs: i64) -> NaiveDate {
    (now + ChronoDuration::seconds(utc_offset_secs)).date_naive()
}

/// Remove days that are already over at the location.
fn drop_past_days(days: &mut Vec<ForecastDay>, today: NaiveDate) {
    days.retain(|day| {
        NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
            .map(|date| date >= today)
            .unwrap_or(false)
    });
}

/// `ttl`, capped so the entry expires no later than the next local midnight.
fn ttl_within_local_day(now: DateTime<Utc>, utc_offset_secs: i64, ttl: Duration) -> Duration {
    let local = now + ChronoDuration::seconds(utc_offset_secs);
    let Some(midnight) = local
        .date_naive()
        .succ_opt()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    else {
        return ttl;
    };
    let remaining = (midnight.and_utc() - local).to_std().unwrap_or(Duration::ZERO);
    ttl.min(remaining)
}

fn placeholder_temperature(units: Units) -> f64 {
    match units {
        Units::Metric => 20.0,
        Units::Imperial => 68.0,
    }
}

fn placeholder_current(lat: f64, lon: f64, units: Units, now: DateTime<Utc>) -> WeatherSnapshot {
    WeatherSnapshot {
        location: coordinate_label(lat, lon),
        latitude: lat,
        longitude: lon,
        units,
        temperature: placeholder_temperature(units),
        feels_like: placeholder_temperature(units),
        condition: "unavailable".to_string(),
        icon: String::new(),
        humidity: 0,
        wind_speed: 0.0,
        wind_direction: wind_direction(0.0).to_string(),
        pressure: normalize_pressure(STANDARD_PRESSURE_HPA, units),
        timestamp: now,
        degraded: true,
    }
}

fn placeholder_forecast(lat: f64, lon: f64, units: Units) -> Forecast {
    Forecast {
        location: coordinate_label(lat, lon),
        units,
        days: Vec::new(),
        degraded: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    #[test]
    fn test_cache_keys_round_to_three_decimals() {
        assert_eq!(
            current_key(37.77491, -122.41942, Units::Imperial),
            "weather:current:37.775:-122.419:imperial"
        );
        assert_eq!(geocode_key(1.0, 2.0), "geocode:1.000:2.000");
        assert_eq!(
            hourly_key(1.0, 2.0, Units::Metric, 8),
            "weather:hourly:1.000:2.000:metric:8"
        );
        assert_eq!(
            place_search_key("  San Jose ", 5),
            place_search_key("san jose", 5)
        );
        assert_eq!(coordinate_label(37.77491, -122.41942), "Lat: 37.77, Lon: -122.42");
    }

    #[tokio::test]
    async fn test_degraded_mode_skips_provider_and_cache() {
        let mut config = Config::test_default();
        config.weather_api_key = None;
        let cache = MemoryCache::new();
        let service = WeatherService::new(&config, Arc::new(cache.clone()));

        assert!(service.is_degraded());
        let current = service.get_current(10.0, 20.0, Units::Metric).await.unwrap();
        assert!(current.degraded);
        assert_eq!(current.pressure, 1013.0);

        let forecast = service.get_forecast(10.0, 20.0, Units::Imperial).await.unwrap();
        assert!(forecast.degraded);
        assert!(forecast.days.is_empty());

        let hourly = service.get_hourly(10.0, 20.0, Units::Metric, 8).await.unwrap();
        assert!(hourly.degraded);
        assert!(hourly.samples.is_empty());

        let places = service.search_places("Paris", 5).await.unwrap();
        assert!(places.degraded);
        assert!(places.places.is_empty());
        assert!(cache.is_empty());
    }

    fn day(date: &str) -> ForecastDay {
        ForecastDay {
            date: date.to_string(),
            day_name: String::new(),
            high_temp: 20.0,
            low_temp: 10.0,
            condition: "clear sky".to_string(),
            icon: "01d".to_string(),
            humidity: 50,
            wind_speed: 2.0,
            wind_direction: "N".to_string(),
            pressure: 1013.0,
            precipitation: 0,
        }
    }

    fn at(raw: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn test_forecast_ttl_stops_at_local_midnight() {
        let ttl = Duration::from_secs(30 * 60);
        let late = at("2026-07-01T23:50:00Z");
        assert_eq!(ttl_within_local_day(late, 0, ttl), Duration::from_secs(10 * 60));
        // 16:50 in UTC-7, far from midnight.
        assert_eq!(ttl_within_local_day(late, -7 * 3600, ttl), ttl);
        // 00:20 next day in UTC+0:30.
        assert_eq!(ttl_within_local_day(late, 30 * 60, ttl), ttl);
    }

    #[tokio::test]
    async fn test_cached_forecast_after_midnight_drops_yesterday() {
        let config = Config::test_default();
        let cache = MemoryCache::new();
        let service = WeatherService::new(&config, Arc::new(cache.clone()));

        let cached = CachedForecast {
            utc_offset_secs: 0,
            forecast: Forecast {
                location: "Greenwich, GB".to_string(),
                units: Units::Metric,
                days: vec![day("2026-07-01"), day("2026-07-02"), day("2026-07-03")],
                degraded: false,
            },
        };
        set_json(
            &cache,
            &forecast_key(51.48, 0.0, Units::Metric),
            &cached,
            Duration::from_secs(1800),
        )
        .await;

        let before = service
            .forecast_at(51.48, 0.0, Units::Metric, at("2026-07-01T23:50:00Z"))
            .await
            .unwrap();
        assert_eq!(before.days.len(), 3);

        let after = service
            .forecast_at(51.48, 0.0, Units::Metric, at("2026-07-02T00:10:00Z"))
            .await
            .unwrap();
        let dates: Vec<&str> = after.days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2026-07-02", "2026-07-03"]);
    }
}
