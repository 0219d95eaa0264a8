//! Health and service banner endpoints.

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

use crate::config::env::constants::VERSION;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct RootResponse {
    message: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp: f64,
    uptime_seconds: i64,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
}

/// GET / - service banner, no auth.
async fn root() -> impl IntoResponse {
    Json(RootResponse {
        message: "Company Data API",
        status: "active",
    })
}

/// GET /health - liveness, no auth.
async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let now = chrono::Utc::now();
    Json(HealthResponse {
        status: "healthy",
        service: "prospect-agent",
        version: VERSION,
        timestamp: now.timestamp_millis() as f64 / 1000.0,
        uptime_seconds: (now - state.started_at).num_seconds(),
    })
}
