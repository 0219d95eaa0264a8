//! Application state.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use crate::config::{EnvConfig, MatchConfig};
use crate::infra::{LlmClient, RegistryClient};
use crate::services::matcher::CompanyMatcher;
use crate::services::scrape::Fetcher;

/// Global shutdown token for graceful termination of in-flight work.
static GLOBAL_SHUTDOWN: std::sync::OnceLock<CancellationToken> = std::sync::OnceLock::new();

pub fn get_shutdown_token() -> CancellationToken {
    GLOBAL_SHUTDOWN.get_or_init(CancellationToken::new).clone()
}

pub fn trigger_shutdown() {
    if let Some(token) = GLOBAL_SHUTDOWN.get() {
        token.cancel();
    }
}

/// Shared application state.
pub struct AppState {
    /// Environment configuration
    pub config: EnvConfig,
    /// Company registry client
    pub registry: RegistryClient,
    /// Website page fetcher
    pub fetcher: Fetcher,
    /// OpenAI client
    pub llm: LlmClient,
    /// Criteria matcher (criteria cache + LLM concurrency bound)
    pub matcher: CompanyMatcher,
    /// Service start time
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build state from the environment. Fails when the OpenAI key is
    /// missing so a misconfigured deploy dies at startup, not mid-request.
    pub fn new() -> anyhow::Result<Self> {
        let config = EnvConfig::from_env();

        if config.openai_api_key.is_empty() {
            anyhow::bail!("OPENAI_API_KEY must be set");
        }

        tracing::info!(
            port = config.port,
            registry = %config.registry_base_url,
            auth = config.api_key.is_some(),
            scrape_timeout_secs = config.scrape_timeout_secs,
            "Loaded configuration"
        );

        let llm = LlmClient::new(&config.openai_api_key);
        let registry = RegistryClient::new(config.registry_base_url.clone());
        let matcher = CompanyMatcher::new(llm.clone(), MatchConfig::api_defaults());

        Ok(Self {
            registry,
            fetcher: Fetcher::new(),
            llm,
            matcher,
            started_at: Utc::now(),
            config,
        })
    }

    /// Check an `x-api-key` header value against the configured key.
    /// When no key is configured every request passes.
    pub fn api_key_matches(&self, provided: Option<&str>) -> bool {
        match &self.config.api_key {
            None => true,
            Some(expected) => provided == Some(expected.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state_with_key(key: Option<&str>) -> AppState {
        let config = EnvConfig {
            port: 8080,
            api_key: key.map(str::to_string),
            openai_api_key: "test-key".to_string(),
            registry_base_url: "https://registry.test".to_string(),
            scrape_timeout_secs: 85,
            company_timeout_secs: 120,
        };

        let llm = LlmClient::new(&config.openai_api_key);
        AppState {
            registry: RegistryClient::new(config.registry_base_url.clone()),
            fetcher: Fetcher::new(),
            llm: llm.clone(),
            matcher: CompanyMatcher::new(llm, MatchConfig::api_defaults()),
            started_at: Utc::now(),
            config,
        }
    }

    #[test]
    fn test_api_key_open_when_unset() {
        let state = state_with_key(None);
        assert!(state.api_key_matches(None));
        assert!(state.api_key_matches(Some("anything")));
    }

    #[test]
    fn test_api_key_enforced_when_set() {
        let state = state_with_key(Some("secret"));
        assert!(state.api_key_matches(Some("secret")));
        assert!(!state.api_key_matches(Some("wrong")));
        assert!(!state.api_key_matches(None));
    }
}
