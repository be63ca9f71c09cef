// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Periodic cleanup of expired cache entries and idle rate-limit windows.

use crate::AppState;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Run one cleanup pass.
pub async fn sweep(state: &AppState) {
    let expired = state.cache.purge_expired().await;
    let idle = state.rate_limiter.sweep();
    if expired > 0 || idle > 0 {
        tracing::debug!(expired, idle, "Maintenance sweep");
    }
}

/// Spawn the background task that sweeps every `sweep_interval`.
pub fn spawn_maintenance(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.config.sweep_interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep(&state).await;
        }
    })
}
