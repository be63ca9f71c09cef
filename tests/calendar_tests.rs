// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Calendar endpoint tests against mocked Google token and Calendar APIs.

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;
use weather_companion::db::TokenStore;
use weather_companion::models::CalendarToken;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod common;
use common::{body_json, create_test_app, create_test_app_with, empty, get, mock_config, send_json, TestApp};

const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";

async fn store_token(app: &TestApp, user_id: &str, access: &str, refresh: &str, expires_in: Duration) {
    let now = Utc::now();
    app.db
        .set_token(&CalendarToken {
            user_id: user_id.to_string(),
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            token_type: "Bearer".to_string(),
            expiry: now + expires_in,
            scope: "https://www.googleapis.com/auth/calendar.readonly".to_string(),
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
}

async fn mock_events(server: &MockServer, access: &str) {
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(header("authorization", format!("Bearer {}", access).as_str()))
        .and(query_param("singleEvents", "true"))
        .and(query_param("orderBy", "startTime"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {
                    "id": "e1",
                    "summary": "Standup",
                    "start": { "dateTime": "2026-07-01T16:00:00Z" },
                    "end": { "dateTime": "2026-07-01T16:15:00Z" },
                    "attendees": [{ "email": "a@b.com" }, { "email": "c@d.com" }]
                },
                {
                    "id": "e2",
                    "summary": "Holiday",
                    "start": { "date": "2026-07-04" },
                    "end": { "date": "2026-07-05" }
                }
            ]
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_events_without_grant_is_not_connected() {
    let app = create_test_app();
    let (_, token) = app.seed_user("g1", "a@b.com").await;

    let response = app.send(get("/calendar/events", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Calendar not connected");

    let response = app.send(get("/calendar/status", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["has_access"], false);
    assert!(json.get("expires_at").is_none());
}

#[tokio::test]
async fn test_connect_stores_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=authorization_code"))
        .and(body_string_contains("code=cal-code"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "cal-at",
            "refresh_token": "cal-rt",
            "token_type": "Bearer",
            "expires_in": 3600,
            "scope": "https://www.googleapis.com/auth/calendar.readonly"
        })))
        .mount(&server)
        .await;

    let app = create_test_app_with(mock_config(&server.uri()));
    let (user, token) = app.seed_user("g1", "a@b.com").await;

    let response = app
        .send(send_json(
            "POST",
            "/calendar/connect",
            Some(&token),
            json!({ "code": "cal-code" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["has_access"], true);
    assert!(json["expires_at"].as_str().unwrap().ends_with('Z'));

    let stored = app.db.get_token(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "cal-at");
    assert_eq!(stored.refresh_token, "cal-rt");

    let response = app.send(get("/calendar/status", Some(&token))).await;
    assert_eq!(body_json(response).await["has_access"], true);
}

#[tokio::test]
async fn test_connect_requires_code() {
    let app = create_test_app();
    let (_, token) = app.seed_user("g1", "a@b.com").await;

    let response = app
        .send(send_json(
            "POST",
            "/calendar/connect",
            Some(&token),
            json!({ "code": "" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .send(send_json("POST", "/calendar/connect", Some(&token), json!({})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_list_events_maps_timed_and_all_day() {
    let server = MockServer::start().await;
    mock_events(&server, "live-at").await;

    let app = create_test_app_with(mock_config(&server.uri()));
    let (user, token) = app.seed_user("g1", "a@b.com").await;
    store_token(&app, &user.id, "live-at", "rt", Duration::hours(1)).await;

    let response = app
        .send(get(
            "/calendar/events?time_min=2026-07-01T00:00:00Z&time_max=2026-07-08T00:00:00Z",
            Some(&token),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["total"], 2);

    let events = json["events"].as_array().unwrap();
    assert_eq!(events[0]["id"], "e1");
    assert_eq!(events[0]["all_day"], false);
    assert_eq!(events[0]["attendees"], json!(["a@b.com", "c@d.com"]));
    assert_eq!(events[1]["id"], "e2");
    assert_eq!(events[1]["all_day"], true);
    assert_eq!(events[1]["description"], "");
}

#[tokio::test]
async fn test_events_query_validation() {
    let app = create_test_app();
    let (_, token) = app.seed_user("g1", "a@b.com").await;

    for uri in [
        "/calendar/events?time_min=yesterday",
        "/calendar/events?time_min=2026-07-08T00:00:00Z&time_max=2026-07-01T00:00:00Z",
        "/calendar/events?max_results=lots",
    ] {
        let response = app.send(get(uri, Some(&token))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
    }
}

#[tokio::test]
async fn test_max_results_is_clamped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(EVENTS_PATH))
        .and(query_param("maxResults", "250"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let app = create_test_app_with(mock_config(&server.uri()));
    let (user, token) = app.seed_user("g1", "a@b.com").await;
    store_token(&app, &user.id, "live-at", "rt", Duration::hours(1)).await;

    let response = app
        .send(get("/calendar/events?max_results=1000", Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["total"], 0);
}

#[tokio::test]
async fn test_expired_token_is_refreshed_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=rt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "fresh",
            "token_type": "Bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;
    mock_events(&server, "fresh").await;

    let app = create_test_app_with(mock_config(&server.uri()));
    let (user, token) = app.seed_user("g1", "a@b.com").await;
    // Inside the five minute margin counts as expired.
    store_token(&app, &user.id, "stale", "rt", Duration::minutes(2)).await;

    let response = app.send(get("/calendar/events", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["total"], 2);

    let stored = app.db.get_token(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.access_token, "fresh");
    assert_eq!(stored.refresh_token, "rt");
    assert!(stored.expiry > Utc::now() + Duration::minutes(50));

    // The stored token is fresh now; no second refresh.
    let response = app.send(get("/calendar/events", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_revoked_refresh_token_drops_grant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Token has been expired or revoked."
        })))
        .mount(&server)
        .await;

    let app = create_test_app_with(mock_config(&server.uri()));
    let (user, token) = app.seed_user("g1", "a@b.com").await;
    store_token(&app, &user.id, "stale", "revoked", Duration::minutes(-10)).await;

    let response = app.send(get("/calendar/events", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(app.db.get_token(&user.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_without_refresh_token_is_not_connected() {
    let app = create_test_app();
    let (user, token) = app.seed_user("g1", "a@b.com").await;
    store_token(&app, &user.id, "stale", "", Duration::minutes(-10)).await;

    let response = app.send(get("/calendar/events", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sync_with_and_without_body() {
    let server = MockServer::start().await;
    mock_events(&server, "live-at").await;

    let app = create_test_app_with(mock_config(&server.uri()));
    let (user, token) = app.seed_user("g1", "a@b.com").await;
    store_token(&app, &user.id, "live-at", "rt", Duration::hours(1)).await;

    let response = app.send(empty("POST", "/calendar/sync", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["total"], 2);
    assert!(json["synced_at"].is_string());

    let response = app
        .send(send_json(
            "POST",
            "/calendar/sync",
            Some(&token),
            json!({
                "time_min": "2026-07-01T00:00:00Z",
                "time_max": "2026-07-02T00:00:00Z",
                "max_results": 10
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .send(send_json(
            "POST",
            "/calendar/sync",
            Some(&token),
            json!({
                "time_min": "2026-07-02T00:00:00Z",
                "time_max": "2026-07-01T00:00:00Z"
            }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_disconnect_is_idempotent() {
    let app = create_test_app();
    let (user, token) = app.seed_user("g1", "a@b.com").await;
    store_token(&app, &user.id, "live-at", "rt", Duration::hours(1)).await;

    for _ in 0..2 {
        let response = app
            .send(empty("DELETE", "/calendar/disconnect", Some(&token)))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], true);
    }

    assert!(app.db.get_token(&user.id).await.unwrap().is_none());
    let response = app.send(get("/calendar/status", Some(&token))).await;
    assert_eq!(body_json(response).await["has_access"], false);
}

#[tokio::test]
async fn test_disconnect_waits_for_inflight_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "access_token": "fresh",
                    "token_type": "Bearer",
                    "expires_in": 3600
                }))
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    mock_events(&server, "fresh").await;

    let app = create_test_app_with(mock_config(&server.uri()));
    let (user, token) = app.seed_user("g1", "a@b.com").await;
    store_token(&app, &user.id, "stale", "rt", Duration::minutes(-10)).await;

    let router = app.router.clone();
    let request = get("/calendar/events", Some(&token));
    let listing = tokio::spawn(async move { router.oneshot(request).await.unwrap() });

    // Let the listing reach the slow refresh before disconnecting.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let response = app
        .send(empty("DELETE", "/calendar/disconnect", Some(&token)))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let listed = listing.await.unwrap();
    assert!(
        matches!(listed.status(), StatusCode::OK | StatusCode::NOT_FOUND),
        "{}",
        listed.status()
    );

    // The refreshed token must not outlive the disconnect.
    assert!(app.db.get_token(&user.id).await.unwrap().is_none());
    let response = app.send(get("/calendar/status", Some(&token))).await;
    assert_eq!(body_json(response).await["has_access"], false);
}

#[tokio::test]
async fn test_calendar_consent_url() {
    let app = create_test_app();
    let (_, token) = app.seed_user("g1", "a@b.com").await;

    let response = app.send(empty("POST", "/calendar/auth", Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let url = body_json(response).await["url"].as_str().unwrap().to_string();
    assert!(url.contains("calendar.readonly"));
    assert!(url.contains("calendar%2Fcallback"));
    assert!(url.contains("access_type=offline"));
    assert!(url.contains("state="));

    let response = app.send(empty("POST", "/calendar/auth", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_connect_rejects_forged_state() {
    let app = create_test_app();
    let (user, token) = app.seed_user("g1", "a@b.com").await;

    let response = app
        .send(send_json(
            "POST",
            "/calendar/connect",
            Some(&token),
            json!({ "code": "cal-code", "state": "forged" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.db.get_token(&user.id).await.unwrap().is_none());
}
