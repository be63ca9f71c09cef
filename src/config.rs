// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! A `.env` file is honored for local development. Durations use humantime
//! syntax (`"90s"`, `"5m"`, `"24h"`).

use std::env;
use std::time::Duration;

/// Placeholder JWT secret accepted outside production only.
const DEV_JWT_SECRET: &str = "change-me-in-production";

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const CALENDAR_API_URL: &str = "https://www.googleapis.com/calendar/v3";
const WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5";
const GEOCODE_API_URL: &str = "https://api.openweathermap.org/geo/1.0";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Server ---
    /// Deployment environment name (`development`, `production`, ...)
    pub environment: String,
    /// Server port
    pub port: u16,
    /// Frontend URL (default CORS origin)
    pub frontend_url: String,
    /// Origins allowed to make cross-origin requests
    pub allowed_origins: Vec<String>,
    /// GCP project ID; when set, users and tokens live in Firestore
    pub gcp_project_id: Option<String>,

    // --- Google OAuth / Calendar ---
    pub google_client_id: String,
    pub google_client_secret: String,
    /// Redirect URI registered for sign-in
    pub google_redirect_url: String,
    /// Redirect URI registered for the calendar grant
    pub calendar_redirect_url: String,
    pub google_auth_url: String,
    pub google_token_url: String,
    pub google_userinfo_url: String,
    pub calendar_api_url: String,

    // --- OpenWeatherMap ---
    /// API key; `None` puts the weather component in degraded mode
    pub weather_api_key: Option<String>,
    pub weather_api_url: String,
    pub geocode_api_url: String,

    // --- Sessions ---
    /// JWT signing key for session tokens (raw bytes)
    pub jwt_signing_key: Vec<u8>,
    pub session_ttl: Duration,

    // --- Cache ---
    pub weather_ttl: Duration,
    pub forecast_ttl: Duration,
    pub geocode_ttl: Duration,

    // --- Rate limiting ---
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
    /// How often expired cache and limiter entries are purged
    pub sweep_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let frontend_url = env_or("FRONTEND_URL", "http://localhost:3000");
        let allowed_origins = match env::var("CORS_ALLOWED_ORIGINS") {
            Ok(raw) => parse_list(&raw),
            Err(_) => vec![frontend_url.clone()],
        };

        let config = Self {
            environment: env_or("ENV", "development"),
            port: env_or("PORT", "8080")
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", "expected a port number".into()))?,
            frontend_url,
            allowed_origins,
            gcp_project_id: env_opt("GCP_PROJECT_ID"),

            google_client_id: env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            google_client_secret: env::var("GOOGLE_CLIENT_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            google_redirect_url: env_or(
                "GOOGLE_REDIRECT_URL",
                "http://localhost:3000/auth/callback",
            ),
            calendar_redirect_url: env_or(
                "CALENDAR_REDIRECT_URL",
                "http://localhost:3000/calendar/callback",
            ),
            google_auth_url: env_or("GOOGLE_AUTH_URL", GOOGLE_AUTH_URL),
            google_token_url: env_or("GOOGLE_TOKEN_URL", GOOGLE_TOKEN_URL),
            google_userinfo_url: env_or("GOOGLE_USERINFO_URL", GOOGLE_USERINFO_URL),
            calendar_api_url: env_or("CALENDAR_API_URL", CALENDAR_API_URL),

            weather_api_key: env_opt("WEATHER_API_KEY"),
            weather_api_url: env_or("WEATHER_API_BASE_URL", WEATHER_API_URL),
            geocode_api_url: env_or("GEOCODE_API_BASE_URL", GEOCODE_API_URL),

            jwt_signing_key: env_or("JWT_SECRET", DEV_JWT_SECRET).into_bytes(),
            session_ttl: env_duration("JWT_EXPIRATION", Duration::from_secs(24 * 60 * 60))?,

            weather_ttl: env_duration("CACHE_TTL_WEATHER", Duration::from_secs(5 * 60))?,
            forecast_ttl: env_duration("CACHE_TTL_FORECAST", Duration::from_secs(30 * 60))?,
            geocode_ttl: env_duration("CACHE_TTL_GEOCODE", Duration::from_secs(24 * 60 * 60))?,

            rate_limit_requests: env_or("RATE_LIMIT_REQUESTS", "100").parse().map_err(|_| {
                ConfigError::Invalid("RATE_LIMIT_REQUESTS", "expected an integer".into())
            })?,
            rate_limit_window: env_duration("RATE_LIMIT_DURATION", Duration::from_secs(60))?,
            sweep_interval: env_duration("SWEEP_INTERVAL", Duration::from_secs(60))?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that are only acceptable in development.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.is_production() && self.jwt_signing_key == DEV_JWT_SECRET.as_bytes() {
            return Err(ConfigError::Missing("JWT_SECRET"));
        }
        if self.rate_limit_requests == 0 {
            return Err(ConfigError::Invalid(
                "RATE_LIMIT_REQUESTS",
                "must be greater than 0".into(),
            ));
        }
        if self.rate_limit_window.is_zero() {
            return Err(ConfigError::Invalid(
                "RATE_LIMIT_DURATION",
                "must be greater than 0".into(),
            ));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "SWEEP_INTERVAL",
                "must be greater than 0".into(),
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Config for tests. Provider URLs point at an unroutable address so a
    /// test that forgets to mock a provider fails loudly.
    pub fn test_default() -> Self {
        Self {
            environment: "test".to_string(),
            port: 8080,
            frontend_url: "http://localhost:3000".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            gcp_project_id: None,
            google_client_id: "test_client_id".to_string(),
            google_client_secret: "test_secret".to_string(),
            google_redirect_url: "http://localhost:3000/auth/callback".to_string(),
            calendar_redirect_url: "http://localhost:3000/calendar/callback".to_string(),
            google_auth_url: GOOGLE_AUTH_URL.to_string(),
            google_token_url: "http://127.0.0.1:9/token".to_string(),
            google_userinfo_url: "http://127.0.0.1:9/userinfo".to_string(),
            calendar_api_url: "http://127.0.0.1:9/calendar/v3".to_string(),
            weather_api_key: Some("test_weather_key".to_string()),
            weather_api_url: "http://127.0.0.1:9/data/2.5".to_string(),
            geocode_api_url: "http://127.0.0.1:9/geo/1.0".to_string(),
            jwt_signing_key: b"test_jwt_key_32_bytes_minimum!!".to_vec(),
            session_ttl: Duration::from_secs(24 * 60 * 60),
            weather_ttl: Duration::from_secs(5 * 60),
            forecast_ttl: Duration::from_secs(30 * 60),
            geocode_ttl: Duration::from_secs(24 * 60 * 60),
            rate_limit_requests: 100,
            rate_limit_window: Duration::from_secs(60),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

/// Read a variable, treating empty values as unset.
fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_duration(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env_opt(key) {
        Some(raw) => parse_duration(key, &raw),
        None => Ok(default),
    }
}

fn parse_duration(key: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|e| ConfigError::Invalid(key, e.to_string()))
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("GOOGLE_CLIENT_ID", "test_id");
        env::set_var("GOOGLE_CLIENT_SECRET", " test_secret ");
        env::set_var("CACHE_TTL_WEATHER", "2m");
        env::set_var("CORS_ALLOWED_ORIGINS", "https://app.example.com/, http://localhost:3000");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.google_client_id, "test_id");
        assert_eq!(config.google_client_secret, "test_secret");
        assert_eq!(config.weather_ttl, Duration::from_secs(120));
        assert_eq!(config.forecast_ttl, Duration::from_secs(30 * 60));
        assert_eq!(
            config.allowed_origins,
            vec!["https://app.example.com", "http://localhost:3000"]
        );
    }

    #[test]
    fn test_production_requires_real_secret() {
        let mut config = Config::test_default();
        config.environment = "production".to_string();
        config.jwt_signing_key = DEV_JWT_SECRET.as_bytes().to_vec();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing("JWT_SECRET"))
        ));

        config.jwt_signing_key = b"a-real-production-secret-value!!".to_vec();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_intervals_rejected() {
        let mut config = Config::test_default();
        config.sweep_interval = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("SWEEP_INTERVAL", _))
        ));

        let mut config = Config::test_default();
        config.rate_limit_window = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("RATE_LIMIT_DURATION", _))
        ));
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        assert!(parse_duration("X", "soon").is_err());
        assert_eq!(
            parse_duration("X", "1h 30m").unwrap(),
            Duration::from_secs(5400)
        );
    }
}
