// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Liveness and readiness probes.

use crate::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
    /// True when weather data is placeholder only
    pub weather_degraded: bool,
}

/// Health check response
async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
        weather_degraded: state.weather_service.is_degraded(),
    })
}

#[derive(Serialize)]
pub struct ProbeResponse {
    pub status: &'static str,
}

async fn live() -> Json<ProbeResponse> {
    Json(ProbeResponse { status: "alive" })
}

/// Ready once the user store answers.
async fn ready(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ProbeResponse>) {
    match state.users.ping().await {
        Ok(()) => (StatusCode::OK, Json(ProbeResponse { status: "ready" })),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ProbeResponse {
                    status: "unavailable",
                }),
            )
        }
    }
}
