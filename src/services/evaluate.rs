//! Batch evaluation orchestration.
//!
//! Criteria analysis happens once per batch; companies run concurrently
//! inside each chunk with per-stage timeouts, and every failure becomes a
//! per-item result instead of sinking the batch.

use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::time::{sleep, timeout, Duration};
use tracing::{error, info};

use crate::config::env::constants::{EVAL_TIMEOUT_SECS, MATCH_THRESHOLD};
use crate::domain::company::CompanyProfile;
use crate::domain::matching::{CriteriaInfo, MatchResult};
use crate::services::profile;
use crate::state::AppState;

/// Per-company outcome inside a batch.
#[derive(Debug, Serialize)]
pub struct BatchItem {
    pub org_number: String,
    pub is_match: bool,
    pub match_score: u8,
    pub reason: String,
    pub confidence: f64,
    pub matched_keywords: Vec<String>,
    pub unmatched_keywords: Vec<String>,
    pub processing_time: f64,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub company_profile: Option<CompanyProfile>,
}

impl BatchItem {
    fn failed(
        org_number: &str,
        reason: impl Into<String>,
        error: impl Into<String>,
        profile: Option<CompanyProfile>,
    ) -> Self {
        Self {
            org_number: org_number.to_string(),
            is_match: false,
            match_score: 0,
            reason: reason.into(),
            confidence: 0.0,
            matched_keywords: Vec::new(),
            unmatched_keywords: Vec::new(),
            processing_time: 0.0,
            status: "failed",
            error: Some(error.into()),
            company_profile: profile,
        }
    }

    fn success(org_number: &str, verdict: MatchResult, profile: CompanyProfile) -> Self {
        Self {
            org_number: org_number.to_string(),
            is_match: verdict.match_score >= MATCH_THRESHOLD,
            match_score: verdict.match_score,
            reason: verdict.reason,
            confidence: verdict.confidence,
            matched_keywords: verdict.matched_keywords,
            unmatched_keywords: verdict.unmatched_keywords,
            processing_time: verdict.processing_time,
            status: "success",
            error: None,
            company_profile: Some(profile),
        }
    }
}

/// Evaluate a batch of org numbers against one criteria string.
pub async fn process_batch(
    state: Arc<AppState>,
    org_numbers: Vec<String>,
    criteria: String,
    batch_size: usize,
) -> Vec<BatchItem> {
    let total = org_numbers.len();
    info!(total = total, batch_size = batch_size, "Starting batch processing");

    // One criteria analysis for the whole batch
    let criteria_info = state.matcher.extract_criteria_info(&criteria).await;
    info!(summary = %criteria_info.summary, "Criteria extracted for batch");

    let batch_size = batch_size.max(1);
    let mut results = Vec::with_capacity(total);

    for (chunk_idx, chunk) in org_numbers.chunks(batch_size).enumerate() {
        info!(
            chunk = chunk_idx + 1,
            from = chunk_idx * batch_size + 1,
            to = (chunk_idx * batch_size + chunk.len()).min(total),
            "Processing chunk"
        );

        let futures = chunk
            .iter()
            .map(|org| process_single(&state, org, &criteria, &criteria_info));
        results.extend(join_all(futures).await);

        // Breather between chunks to stay under upstream rate limits
        if (chunk_idx + 1) * batch_size < total {
            sleep(Duration::from_millis(500)).await;
        }
    }

    info!(results = results.len(), "Batch processing completed");
    results
}

async fn process_single(
    state: &Arc<AppState>,
    org_number: &str,
    criteria: &str,
    criteria_info: &CriteriaInfo,
) -> BatchItem {
    let company_cap = Duration::from_secs(state.config.company_timeout_secs);

    // Stage 1: full profile (registry + scrape + enrichment)
    let company_profile = match timeout(
        company_cap,
        profile::get_company_data(state, org_number, Some(criteria)),
    )
    .await
    {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            return BatchItem::failed(
                org_number,
                "Failed to retrieve company data",
                "Company data not found",
                None,
            );
        }
        Err(_) => {
            error!(org_number = %org_number, "Timeout getting company data");
            return BatchItem::failed(
                org_number,
                format!(
                    "Timeout retrieving company data after {}s",
                    state.config.company_timeout_secs
                ),
                format!("Timeout after {} seconds", state.config.company_timeout_secs),
                None,
            );
        }
    };

    // Stage 2: deep registry document for the evaluator
    let full_doc = match timeout(company_cap, state.registry.full_profile(org_number)).await {
        Ok(Ok(Some(full))) => serde_json::to_value(full).unwrap_or(Value::Null),
        Ok(_) => {
            return BatchItem::failed(
                org_number,
                "Failed to retrieve cleaned company data",
                "Cleaned company data not found",
                Some(company_profile),
            );
        }
        Err(_) => {
            error!(org_number = %org_number, "Timeout getting cleaned company data");
            return BatchItem::failed(
                org_number,
                format!(
                    "Timeout retrieving cleaned company data after {}s",
                    state.config.company_timeout_secs
                ),
                format!("Timeout after {} seconds", state.config.company_timeout_secs),
                Some(company_profile),
            );
        }
    };

    // Stage 3: LLM verdict
    match timeout(
        Duration::from_secs(EVAL_TIMEOUT_SECS),
        state.matcher.evaluate_match(criteria_info, &full_doc),
    )
    .await
    {
        Ok(verdict) => BatchItem::success(org_number, verdict, company_profile),
        Err(_) => {
            error!(org_number = %org_number, "Timeout evaluating match");
            BatchItem::failed(
                org_number,
                "Timeout evaluating match criteria",
                "Match evaluation timeout",
                Some(company_profile),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_item_shape() {
        let item = BatchItem::failed("556677-8899", "reason", "error detail", None);
        assert_eq!(item.status, "failed");
        assert!(!item.is_match);
        assert_eq!(item.match_score, 0);
        assert_eq!(item.error.as_deref(), Some("error detail"));
        assert!(item.company_profile.is_none());
    }

    #[test]
    fn test_success_item_applies_threshold() {
        let verdict = MatchResult {
            match_score: 80,
            ..Default::default()
        };
        let item = BatchItem::success("556677-8899", verdict, CompanyProfile::empty());
        assert!(item.is_match);
        assert_eq!(item.status, "success");

        let verdict = MatchResult {
            match_score: 79,
            ..Default::default()
        };
        let item = BatchItem::success("556677-8899", verdict, CompanyProfile::empty());
        assert!(!item.is_match);
    }
}
