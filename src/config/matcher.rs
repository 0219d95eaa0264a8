//! Criteria-matching tuning knobs.

/// Configuration for the company matcher.
#[derive(Clone, Debug)]
pub struct MatchConfig {
    /// Verdicts below this confidence are logged as weak
    pub min_confidence: f64,
    /// LLM call attempts before giving up
    pub max_retries: u32,
    /// Per-call LLM timeout (seconds)
    pub timeout_seconds: u64,
    /// Companies evaluated concurrently per batch chunk
    pub batch_size: usize,
    /// Upper bound on in-flight LLM calls across the process
    pub max_concurrent: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            max_retries: 3,
            timeout_seconds: 30,
            batch_size: 5,
            max_concurrent: 10,
        }
    }
}

impl MatchConfig {
    /// The values the API layer wires in.
    pub fn api_defaults() -> Self {
        Self {
            min_confidence: 0.75,
            timeout_seconds: 45,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_defaults() {
        let config = MatchConfig::api_defaults();
        assert_eq!(config.min_confidence, 0.75);
        assert_eq!(config.timeout_seconds, 45);
        assert_eq!(config.batch_size, 5);
        assert_eq!(config.max_concurrent, 10);
    }
}
