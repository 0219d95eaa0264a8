//! Criteria-matching models with lenient deserialization.
//!
//! LLM output drifts: scores arrive as strings, confidence as "high",
//! keyword lists as comma-joined text. The deserializers here accept all of
//! it and normalize to the documented ranges instead of failing the request.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::OnceLock;

fn int_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+").unwrap())
}

/// Criteria analysis extracted once per criteria string.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CriteriaInfo {
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub required_fields: Vec<String>,
}

/// Registry profile fields the criteria extractor may select from.
pub const ALLOWED_FIELDS: [&str; 12] = [
    "name",
    "orgnr",
    "purpose",
    "companyType",
    "contact",
    "location",
    "industry",
    "registration",
    "governance",
    "financialSummary",
    "accountingHistory",
    "risks",
];

/// Verdict for one company against one criteria string.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(default, deserialize_with = "lenient_score")]
    pub match_score: u8,
    #[serde(default, deserialize_with = "lenient_string")]
    pub reason: String,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: f64,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub matched_keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub unmatched_keywords: Vec<String>,
    #[serde(default)]
    pub processing_time: f64,
}

impl MatchResult {
    /// Zero-score result carrying a failure explanation.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            ..Self::default()
        }
    }
}

fn lenient_score<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(score_from_value(&value))
}

fn score_from_value(value: &Value) -> u8 {
    match value {
        Value::Number(n) => n.as_f64().map(clamp_score).unwrap_or(0),
        Value::String(s) => {
            if let Some(m) = int_re().find(s) {
                m.as_str().parse::<f64>().map(clamp_score).unwrap_or(0)
            } else {
                s.trim().parse::<f64>().map(clamp_score).unwrap_or(0)
            }
        }
        _ => 0,
    }
}

fn clamp_score(v: f64) -> u8 {
    v.clamp(0.0, 100.0) as u8
}

fn lenient_confidence<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(confidence_from_value(&value))
}

fn confidence_from_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0).clamp(0.0, 1.0),
        Value::String(s) => confidence_from_str(s),
        _ => 0.0,
    }
}

fn confidence_from_str(s: &str) -> f64 {
    let lower = s.trim().to_lowercase();

    let mapped = match lower.as_str() {
        "very high" => Some(0.95),
        "high" => Some(0.9),
        "medium high" => Some(0.75),
        "medium" => Some(0.7),
        "uncertain" => Some(0.5),
        "medium low" => Some(0.4),
        "low" => Some(0.3),
        "doubtful" => Some(0.3),
        "very low" => Some(0.2),
        "certain" => Some(1.0),
        _ => None,
    };
    if let Some(v) = mapped {
        return v;
    }

    if let Some(percent) = lower.strip_suffix('%') {
        if let Ok(v) = percent.trim().parse::<f64>() {
            return (v / 100.0).clamp(0.0, 1.0);
        }
    }

    if let Ok(v) = lower.parse::<f64>() {
        // Values above 1.0 are percentages missing their sign
        if v > 1.0 {
            return (v / 100.0).clamp(0.0, 1.0);
        }
        return v.clamp(0.0, 1.0);
    }

    0.0
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(string_from_value(&value))
}

fn string_from_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" "),
        Value::Object(_) => value.to_string(),
        other => other.to_string(),
    }
}

fn lenient_string_list<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(string_list_from_value(&value))
}

fn string_list_from_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s.trim().to_string(),
                other => other.to_string(),
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(s) => {
            // JSON array first, comma-separated fallback
            if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(s) {
                return string_list_from_value(&Value::Array(items));
            }
            s.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        }
        Value::Object(map) => map
            .values()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Salvage a [`MatchResult`] from prose when every JSON strategy failed.
pub fn match_result_from_text(content: &str) -> MatchResult {
    static SCORE_RE: OnceLock<Regex> = OnceLock::new();
    static CONF_RE: OnceLock<Regex> = OnceLock::new();
    static REASON_RE: OnceLock<Regex> = OnceLock::new();

    let score_re =
        SCORE_RE.get_or_init(|| Regex::new(r"(?i)match[_\s-]?score[\s:]*(\d+)").unwrap());
    let conf_re =
        CONF_RE.get_or_init(|| Regex::new(r"(?i)confidence[\s:]*([\d.]+%?|\w+)").unwrap());
    let reason_re = REASON_RE.get_or_init(|| Regex::new(r"(?i)reason[\s:]*([^.]+\.)").unwrap());

    let mut result = MatchResult::default();

    if let Some(caps) = score_re.captures(content) {
        result.match_score = caps[1].parse::<f64>().map(clamp_score).unwrap_or(0);
    }

    if let Some(caps) = conf_re.captures(content) {
        result.confidence = confidence_from_str(&caps[1]);
    }

    if let Some(caps) = reason_re.captures(content) {
        result.reason = caps[1].trim().to_string();
    } else {
        // First sentence, capped
        let first = content
            .split(['.', '!', '?'])
            .map(str::trim)
            .find(|s| !s.is_empty())
            .unwrap_or("");
        result.reason = first.chars().take(200).collect();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_score_from_number_and_string() {
        let r: MatchResult = serde_json::from_value(json!({"match_score": 85})).unwrap();
        assert_eq!(r.match_score, 85);

        let r: MatchResult = serde_json::from_value(json!({"match_score": "92/100"})).unwrap();
        assert_eq!(r.match_score, 92);

        let r: MatchResult = serde_json::from_value(json!({"match_score": 250})).unwrap();
        assert_eq!(r.match_score, 100);

        let r: MatchResult = serde_json::from_value(json!({"match_score": null})).unwrap();
        assert_eq!(r.match_score, 0);
    }

    #[test]
    fn test_confidence_from_words() {
        let r: MatchResult = serde_json::from_value(json!({"confidence": "high"})).unwrap();
        assert_eq!(r.confidence, 0.9);

        let r: MatchResult = serde_json::from_value(json!({"confidence": "85%"})).unwrap();
        assert!((r.confidence - 0.85).abs() < 1e-9);

        let r: MatchResult = serde_json::from_value(json!({"confidence": 75})).unwrap();
        assert_eq!(r.confidence, 1.0);

        let r: MatchResult = serde_json::from_value(json!({"confidence": "75"})).unwrap();
        assert!((r.confidence - 0.75).abs() < 1e-9);

        let r: MatchResult = serde_json::from_value(json!({"confidence": 0.6})).unwrap();
        assert_eq!(r.confidence, 0.6);
    }

    #[test]
    fn test_keyword_lists_from_string() {
        let r: MatchResult =
            serde_json::from_value(json!({"matched_keywords": "fintech, stockholm"})).unwrap();
        assert_eq!(r.matched_keywords, vec!["fintech", "stockholm"]);

        let r: MatchResult =
            serde_json::from_value(json!({"matched_keywords": "[\"saas\", \"b2b\"]"})).unwrap();
        assert_eq!(r.matched_keywords, vec!["saas", "b2b"]);

        let r: MatchResult =
            serde_json::from_value(json!({"matched_keywords": {"a": "x", "b": "y"}})).unwrap();
        assert_eq!(r.matched_keywords.len(), 2);
    }

    #[test]
    fn test_reason_from_structures() {
        let r: MatchResult =
            serde_json::from_value(json!({"reason": ["strong", "industry fit"]})).unwrap();
        assert_eq!(r.reason, "strong industry fit");

        let r: MatchResult = serde_json::from_value(json!({"reason": {"why": "x"}})).unwrap();
        assert!(r.reason.contains("why"));
    }

    #[test]
    fn test_criteria_info_lenient_fields() {
        let c: CriteriaInfo = serde_json::from_value(json!({
            "summary": ["tech companies", "in stockholm"],
            "required_fields": "industry, location"
        }))
        .unwrap();
        assert_eq!(c.summary, "tech companies in stockholm");
        assert_eq!(c.required_fields, vec!["industry", "location"]);
    }

    #[test]
    fn test_match_result_from_text() {
        let text = "The match_score: 78 with confidence: high. Reason: the company \
                    operates in the requested industry.";
        let r = match_result_from_text(text);
        assert_eq!(r.match_score, 78);
        assert_eq!(r.confidence, 0.9);
        assert!(r.reason.contains("requested industry"));
    }

    #[test]
    fn test_match_result_from_text_without_markers() {
        let r = match_result_from_text("No structure here at all");
        assert_eq!(r.match_score, 0);
        assert_eq!(r.reason, "No structure here at all");
    }
}
