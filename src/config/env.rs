//! Environment variable configuration loading.

use std::env;
use tracing::warn;

/// Environment configuration.
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// Listening port (Cloud-style platforms inject `PORT`)
    pub port: u16,
    /// Optional API key; when unset all routes are open
    pub api_key: Option<String>,
    /// OpenAI API key for enrichment and matching
    pub openai_api_key: String,
    /// Base URL of the company registry endpoint
    pub registry_base_url: String,
    /// Hard cap on website scraping per company (seconds)
    pub scrape_timeout_secs: u64,
    /// Per-company processing cap inside a batch (seconds)
    pub company_timeout_secs: u64,
}

impl EnvConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(8080);

        let api_key = env::var("PROSPECT_API_KEY").ok().filter(|s| !s.is_empty());

        let openai_api_key = env::var("OPENAI_API_KEY").unwrap_or_default();
        if openai_api_key.is_empty() {
            warn!("OPENAI_API_KEY is not set; enrichment and matching calls will fail");
        }

        let registry_base_url = env::var("REGISTRY_BASE_URL")
            .unwrap_or_else(|_| "https://www.allabolag.se".to_string());

        let scrape_timeout_secs = env::var("SCRAPE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(constants::SCRAPE_TIMEOUT_SECS);

        let company_timeout_secs = env::var("COMPANY_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(constants::COMPANY_TIMEOUT_SECS);

        Self {
            port,
            api_key,
            openai_api_key,
            registry_base_url,
            scrape_timeout_secs,
            company_timeout_secs,
        }
    }
}

/// Fixed limits.
pub mod constants {
    /// Match score at or above which a company counts as a match
    pub const MATCH_THRESHOLD: u8 = 80;

    /// Maximum companies accepted in one batch request
    pub const MAX_BATCH_COMPANIES: usize = 100;

    /// Companies evaluated concurrently when the request does not say
    pub const DEFAULT_BATCH_SIZE: usize = 20;

    /// Website scraping cap per company (seconds)
    pub const SCRAPE_TIMEOUT_SECS: u64 = 85;

    /// Full per-company processing cap inside a batch (seconds)
    pub const COMPANY_TIMEOUT_SECS: u64 = 120;

    /// LLM match evaluation cap (seconds)
    pub const EVAL_TIMEOUT_SECS: u64 = 60;

    /// Criteria extraction cache upper bound
    pub const MAX_CRITERIA_CACHE: usize = 1000;

    /// Version string
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");
}

#[cfg(test)]
mod tests {
    use super::*;

    // Single test so parallel test threads never race on the env vars.
    #[test]
    fn test_from_env_defaults_and_overrides() {
        env::remove_var("PORT");
        env::remove_var("REGISTRY_BASE_URL");
        env::remove_var("PROSPECT_API_KEY");
        env::remove_var("SCRAPE_TIMEOUT_SECS");

        let config = EnvConfig::from_env();
        assert_eq!(config.port, 8080);
        assert_eq!(config.registry_base_url, "https://www.allabolag.se");
        assert!(config.api_key.is_none());
        assert_eq!(config.scrape_timeout_secs, constants::SCRAPE_TIMEOUT_SECS);

        env::set_var("PORT", "9090");
        env::set_var("PROSPECT_API_KEY", "secret");
        let config = EnvConfig::from_env();
        assert_eq!(config.port, 9090);
        assert_eq!(config.api_key.as_deref(), Some("secret"));

        env::remove_var("PORT");
        env::remove_var("PROSPECT_API_KEY");
    }
}
