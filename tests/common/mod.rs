// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use chrono::Utc;
use std::sync::Arc;
use weather_companion::cache::MemoryCache;
use weather_companion::config::Config;
use weather_companion::db::{FirestoreDb, MemoryDb, UserStore};
use weather_companion::models::{ProviderIdentity, User};
use weather_companion::routes::create_router;
use weather_companion::AppState;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Test app with handles on its in-memory backends.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub db: MemoryDb,
    pub cache: MemoryCache,
}

#[allow(dead_code)]
impl TestApp {
    /// Send one request through a clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// Insert a user and return it with a valid session token.
    pub async fn seed_user(&self, subject: &str, email: &str) -> (User, String) {
        let identity = ProviderIdentity {
            provider: "google".to_string(),
            subject: subject.to_string(),
            email: email.to_string(),
            name: "Test User".to_string(),
            picture: None,
        };
        let user = User::from_identity(&identity, Utc::now());
        self.db.insert_user(&user).await.unwrap();
        let token = self.state.sessions.issue(&user).unwrap();
        (user, token)
    }
}

/// Create a test app with in-memory stores and the default test config.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    create_test_app_with(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with(config: Config) -> TestApp {
    let db = MemoryDb::new();
    let cache = MemoryCache::new();
    let state = Arc::new(AppState::new(
        config,
        Arc::new(db.clone()),
        Arc::new(db.clone()),
        Arc::new(cache.clone()),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        db,
        cache,
    }
}

/// Test config with every provider pointed at a mock server.
#[allow(dead_code)]
pub fn mock_config(server_uri: &str) -> Config {
    let mut config = Config::test_default();
    config.google_token_url = format!("{}/token", server_uri);
    config.google_userinfo_url = format!("{}/userinfo", server_uri);
    config.calendar_api_url = format!("{}/calendar/v3", server_uri);
    config.weather_api_url = format!("{}/data/2.5", server_uri);
    config.geocode_api_url = format!("{}/geo/1.0", server_uri);
    config
}

#[allow(dead_code)]
pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

#[allow(dead_code)]
pub fn send_json(method: &str, uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[allow(dead_code)]
pub fn empty(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// Read a JSON response body.
#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
