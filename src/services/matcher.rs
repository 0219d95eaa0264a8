//! Criteria matching against company profiles.
//!
//! Criteria analysis runs once per distinct criteria string and is cached;
//! match evaluation is one JSON-mode LLM call per company, bounded by a
//! process-wide semaphore.

use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tracing::{info, warn};

use crate::config::env::constants::MAX_CRITERIA_CACHE;
use crate::config::MatchConfig;
use crate::domain::matching::{match_result_from_text, CriteriaInfo, MatchResult, ALLOWED_FIELDS};
use crate::infra::llm::{self, ChatRequest, LlmClient};

/// Criteria matcher with a shared criteria cache.
pub struct CompanyMatcher {
    llm: LlmClient,
    config: MatchConfig,
    criteria_cache: RwLock<HashMap<String, CriteriaInfo>>,
    semaphore: Arc<Semaphore>,
}

impl CompanyMatcher {
    pub fn new(llm: LlmClient, config: MatchConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent));
        Self {
            llm,
            config,
            criteria_cache: RwLock::new(HashMap::new()),
            semaphore,
        }
    }

    /// Analyze a criteria string: short summary plus which registry fields
    /// matter. Cached per criteria string.
    pub async fn extract_criteria_info(&self, criteria: &str) -> CriteriaInfo {
        {
            let cache = self.criteria_cache.read().await;
            if let Some(cached) = cache.get(criteria) {
                return cached.clone();
            }
        }

        let info = self.extract_criteria_uncached(criteria).await;

        let mut cache = self.criteria_cache.write().await;
        if cache.len() >= MAX_CRITERIA_CACHE {
            cache.clear();
        }
        cache.insert(criteria.to_string(), info.clone());
        info
    }

    async fn extract_criteria_uncached(&self, criteria: &str) -> CriteriaInfo {
        let system = format!(
            "You are an expert in analyzing business/investment criteria and mapping them to a \
             fixed schema of company data.\n\n\
             ### Allowed Fields\n\
             You may ONLY choose from these fields:\n{}\n\n\
             ### Task\n\
             Read the criteria and list which of these fields are required to determine whether \
             the company meets the criteria.\n\n\
             ### Output Format (STRICT JSON ONLY)\n\
             {{\n    \"summary\": \"short summary text\",\n    \"required_fields\": [\"field1\", \"field2\"]\n}}\n\n\
             ### Rules\n\
             - Only output fields directly required by the criteria.\n\
             - DO NOT output fields not in the allowed list.\n\
             - DO NOT infer beyond what the criteria explicitly needs.\n\
             - Response must be valid JSON only.",
            ALLOWED_FIELDS
                .iter()
                .map(|f| format!("- {}", f))
                .collect::<Vec<_>>()
                .join("\n")
        );

        let prompt = format!(
            "Analyze the following criteria and identify:\n\
             1. A short summary\n\
             2. Which of the allowed fields are required to evaluate the criteria\n\n\
             Criteria:\n\"\"\"{}\"\"\"",
            criteria
        );

        let _permit = self.semaphore.acquire().await.ok();

        let result = self
            .llm
            .chat(ChatRequest {
                model: llm::MODEL_STRUCTURED,
                system: Some(&system),
                user: &prompt,
                max_tokens: 500,
                temperature: 0.1,
                json_mode: true,
            })
            .await;

        match result {
            Ok(content) => parse_criteria_response(&content),
            Err(e) => {
                warn!(error = %e, "Criteria extraction failed");
                CriteriaInfo {
                    summary: "Failed to parse response".to_string(),
                    required_fields: Vec::new(),
                }
            }
        }
    }

    /// Evaluate one company document against extracted criteria.
    pub async fn evaluate_match(
        &self,
        criteria_info: &CriteriaInfo,
        company_data: &Value,
    ) -> MatchResult {
        let started = Utc::now();

        let system = "You are an expert company evaluator.\n\n\
             Analyze the company against the criteria and return a JSON object with these EXACT fields:\n\
             - match_score: integer from 0-100 (higher = better match)\n\
             - reason: string explanation with specific evidence\n\
             - confidence: decimal number from 0.0 to 1.0 (NOT text like 'high' or 'low')\n\
             - matched_keywords: array of strings (which criteria keywords were found)\n\
             - unmatched_keywords: array of strings (which criteria keywords were missing)\n\n\
             IMPORTANT:\n\
             - confidence MUST be a number between 0.0 and 1.0, NOT text\n\
             - All fields must be present\n\
             - Return ONLY valid JSON";

        let criteria_json =
            serde_json::to_string_pretty(criteria_info).unwrap_or_else(|_| "{}".to_string());
        let company_json =
            serde_json::to_string_pretty(company_data).unwrap_or_else(|_| "{}".to_string());

        let prompt = format!(
            "CRITERIA (JSON):\n{criteria_json}\n\nCOMPANY DATA (JSON):\n{company_json}\n\n\
             Evaluate and return JSON with the required fields."
        );

        let _permit = self.semaphore.acquire().await.ok();

        let result = self
            .llm
            .chat(ChatRequest {
                model: llm::MODEL_STRUCTURED,
                system: Some(system),
                user: &prompt,
                max_tokens: 500,
                temperature: 0.1,
                json_mode: true,
            })
            .await;

        let mut verdict = match result {
            Ok(content) => parse_match_response(&content),
            Err(e) => MatchResult::failure(format!("Evaluation failed: {}", e)),
        };

        verdict.processing_time =
            (Utc::now() - started).num_milliseconds().max(0) as f64 / 1000.0;

        if verdict.confidence < self.config.min_confidence {
            info!(
                score = verdict.match_score,
                confidence = verdict.confidence,
                "Low-confidence verdict"
            );
        }

        verdict
    }

    /// Full single-company check: criteria analysis plus evaluation over
    /// the complete company document.
    pub async fn check_match(&self, criteria: &str, company_data: &Value) -> MatchResult {
        if !company_data.is_object()
            || company_data.as_object().is_some_and(|m| m.is_empty())
        {
            warn!("Invalid or empty company data received");
            return MatchResult::failure("No valid company data available for evaluation");
        }

        let criteria_info = self.extract_criteria_info(criteria).await;
        info!(summary = %criteria_info.summary, "Criteria extracted");

        // The full document goes to the LLM; it decides what is relevant
        self.evaluate_match(&criteria_info, company_data).await
    }
}

fn parse_criteria_response(content: &str) -> CriteriaInfo {
    if let Some(value) = llm::parse_json_response(content) {
        if let Ok(info) = serde_json::from_value::<CriteriaInfo>(value) {
            return info;
        }
    }
    CriteriaInfo {
        summary: "Failed to parse response".to_string(),
        required_fields: Vec::new(),
    }
}

fn parse_match_response(content: &str) -> MatchResult {
    if let Some(value) = llm::parse_json_response(content) {
        if let Ok(result) = serde_json::from_value::<MatchResult>(value) {
            return result;
        }
    }
    // Last resort: mine the prose
    match_result_from_text(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_criteria_response_lenient() {
        let info = parse_criteria_response(
            r#"{"summary": "tech in stockholm", "required_fields": ["industry", "location"]}"#,
        );
        assert_eq!(info.summary, "tech in stockholm");
        assert_eq!(info.required_fields, vec!["industry", "location"]);

        let fallback = parse_criteria_response("total nonsense");
        assert_eq!(fallback.summary, "Failed to parse response");
    }

    #[test]
    fn test_parse_match_response_json_and_prose() {
        let from_json = parse_match_response(
            r#"{"match_score": 85, "reason": "industry fit", "confidence": 0.8,
                "matched_keywords": ["tech"], "unmatched_keywords": []}"#,
        );
        assert_eq!(from_json.match_score, 85);
        assert_eq!(from_json.confidence, 0.8);

        let from_prose =
            parse_match_response("match_score: 60, confidence: medium. Reason: partial fit.");
        assert_eq!(from_prose.match_score, 60);
        assert_eq!(from_prose.confidence, 0.7);
    }

    #[test]
    fn test_match_result_failure_shape() {
        let failure = MatchResult::failure("nope");
        assert_eq!(failure.match_score, 0);
        assert_eq!(failure.reason, "nope");
        assert_eq!(failure.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_check_match_rejects_empty_document() {
        let matcher = CompanyMatcher::new(LlmClient::new("test-key"), MatchConfig::default());
        let verdict = matcher.check_match("tech companies", &json!({})).await;
        assert_eq!(verdict.match_score, 0);
        assert!(verdict.reason.contains("No valid company data"));

        let verdict = matcher.check_match("tech companies", &json!("text")).await;
        assert_eq!(verdict.match_score, 0);
    }
}
