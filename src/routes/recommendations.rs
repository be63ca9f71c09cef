// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use crate::models::Recommendation;
use crate::services::recommendation::static_recommendations;
use crate::AppState;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/recommendations", get(list))
}

#[derive(Serialize)]
pub struct RecommendationsResponse {
    pub success: bool,
    pub recommendations: Vec<Recommendation>,
}

async fn list() -> Json<RecommendationsResponse> {
    Json(RecommendationsResponse {
        success: true,
        recommendations: static_recommendations(),
    })
}
