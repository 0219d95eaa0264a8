//! API module.
//!
//! HTTP handlers and router assembly.

pub mod company;
pub mod evaluate;
pub mod health;

use axum::Router;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Build the complete API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health & banner
        .merge(health::router())
        // Evaluation
        .merge(evaluate::router())
        // Query resolution
        .merge(company::router())
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
