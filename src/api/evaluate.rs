//! Company evaluation API.
//!
//! `/evaluate-company` scores one company against a criteria string;
//! `/evaluate-batch` does the same for up to 100 companies with aggregate
//! statistics.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;

use crate::config::env::constants::{DEFAULT_BATCH_SIZE, MATCH_THRESHOLD, MAX_BATCH_COMPANIES};
use crate::domain::company::CompanyProfile;
use crate::error::{ApiError, ApiResult};
use crate::middleware::RequireApiKey;
use crate::services::evaluate::{process_batch, BatchItem};
use crate::services::profile;
use crate::state::AppState;

/// Single-company evaluation request.
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub org_number: String,
    pub criteria: String,
}

/// Batch evaluation request.
#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub org_numbers: Vec<String>,
    #[serde(default)]
    pub criteria: Option<String>,
    #[serde(default)]
    pub batch_id: Option<String>,
    /// Companies processed concurrently at a time
    #[serde(default)]
    pub batch_size: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub org_number: String,
    pub is_match: bool,
    pub match_score: u8,
    pub reason: String,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
    pub unmatched_keywords: Vec<String>,
    pub company_profile: CompanyProfile,
    pub processing_time_seconds: f64,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub batch_id: String,
    pub total_companies: usize,
    pub processed_companies: usize,
    pub successful_evaluations: usize,
    pub failed_evaluations: usize,
    pub matching_companies: usize,
    pub match_rate: String,
    pub total_processing_time_seconds: f64,
    pub average_time_per_company: f64,
    pub results: Vec<BatchItem>,
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/evaluate-company", post(evaluate_company))
        .route("/evaluate-batch", post(evaluate_batch))
}

/// POST /evaluate-company
///
/// Requires API key when one is configured.
async fn evaluate_company(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Json(request): Json<EvaluateRequest>,
) -> ApiResult<impl IntoResponse> {
    let started = Utc::now();

    let company_profile = profile::get_company_data(&state, &request.org_number, None)
        .await
        .ok_or_else(|| ApiError::not_found("Company data"))?;

    // The deep registry document is what the evaluator reads; when it is
    // missing the matcher returns a zero-score verdict rather than erroring
    let full_doc = state
        .registry
        .full_profile(&request.org_number)
        .await
        .ok()
        .flatten()
        .and_then(|full| serde_json::to_value(full).ok())
        .unwrap_or(Value::Null);

    let verdict = state.matcher.check_match(&request.criteria, &full_doc).await;

    let processing_time =
        (Utc::now() - started).num_milliseconds().max(0) as f64 / 1000.0;

    info!(
        org_number = %request.org_number,
        match_score = verdict.match_score,
        seconds = processing_time,
        "Company evaluated"
    );

    Ok(Json(EvaluateResponse {
        org_number: request.org_number,
        is_match: verdict.match_score >= MATCH_THRESHOLD,
        match_score: verdict.match_score,
        reason: verdict.reason,
        confidence: verdict.confidence,
        matched_keywords: verdict.matched_keywords,
        unmatched_keywords: verdict.unmatched_keywords,
        company_profile,
        processing_time_seconds: processing_time,
    }))
}

/// POST /evaluate-batch
///
/// Requires API key when one is configured.
async fn evaluate_batch(
    _auth: RequireApiKey,
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<impl IntoResponse> {
    let started = Utc::now();

    if request.org_numbers.is_empty() {
        return Err(ApiError::bad_request("No organization numbers provided"));
    }
    if request.org_numbers.len() > MAX_BATCH_COMPANIES {
        return Err(ApiError::bad_request(format!(
            "Maximum {} companies per batch",
            MAX_BATCH_COMPANIES
        )));
    }

    let batch_id = request
        .batch_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let batch_size = request.batch_size.unwrap_or(DEFAULT_BATCH_SIZE);
    let criteria = request.criteria.unwrap_or_default();
    let total = request.org_numbers.len();

    info!(batch_id = %batch_id, total = total, "Starting batch evaluation");

    let results = process_batch(state.clone(), request.org_numbers, criteria, batch_size).await;

    let successful = results.iter().filter(|r| r.status == "success").count();
    let failed = results.len() - successful;
    let match_count = results.iter().filter(|r| r.is_match).count();

    let processing_time =
        (Utc::now() - started).num_milliseconds().max(0) as f64 / 1000.0;

    let match_rate = if results.is_empty() {
        "0%".to_string()
    } else {
        format!("{:.1}%", match_count as f64 / results.len() as f64 * 100.0)
    };
    let average = if results.is_empty() {
        0.0
    } else {
        round2(processing_time / results.len() as f64)
    };

    info!(
        batch_id = %batch_id,
        seconds = processing_time,
        successful = successful,
        failed = failed,
        matches = match_count,
        "Batch completed"
    );

    Ok(Json(BatchResponse {
        batch_id,
        total_companies: total,
        processed_companies: results.len(),
        successful_evaluations: successful,
        failed_evaluations: failed,
        matching_companies: match_count,
        match_rate,
        total_processing_time_seconds: round2(processing_time),
        average_time_per_company: average,
        results,
    }))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(1.23456), 1.23);
        assert_eq!(round2(1.235), 1.24);
    }

    #[test]
    fn test_batch_request_defaults() {
        let request: BatchRequest =
            serde_json::from_str(r#"{"org_numbers": ["556677-8899"]}"#).unwrap();
        assert!(request.criteria.is_none());
        assert!(request.batch_id.is_none());
        assert!(request.batch_size.is_none());
    }

    #[test]
    fn test_match_rate_formatting() {
        let rate = format!("{:.1}%", 1.0 / 3.0 * 100.0);
        assert_eq!(rate, "33.3%");
    }
}
