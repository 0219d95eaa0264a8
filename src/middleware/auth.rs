//! API key authentication.
//!
//! `RequireApiKey` is an extractor that checks the `x-api-key` header
//! against the configured key. Deployments behind a platform-level auth
//! layer run without a key, in which case every request passes.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

/// API key extractor.
///
/// ```ignore
/// async fn protected_handler(
///     _auth: RequireApiKey,
///     State(state): State<Arc<AppState>>,
/// ) -> impl IntoResponse {
///     // handler body
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RequireApiKey;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireApiKey {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok());

        if state.api_key_matches(provided) {
            Ok(RequireApiKey)
        } else {
            tracing::warn!(provided = provided.is_some(), "API key check failed");
            Err(ApiError::unauthorized())
        }
    }
}
