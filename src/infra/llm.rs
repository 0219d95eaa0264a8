//! OpenAI chat-completions client.
//!
//! Thin wrapper that owns retry, JSON-mode plumbing and the tolerant
//! response parsing every caller needs.

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, ResponseFormat,
    },
    Client,
};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default model for structured calls.
pub const MODEL_STRUCTURED: &str = "gpt-4o-mini";
/// Cheaper model used for single-word classification.
pub const MODEL_CLASSIFY: &str = "gpt-3.5-turbo";

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM call failed: {0}")]
    Api(#[from] async_openai::error::OpenAIError),
    #[error("LLM returned no content")]
    Empty,
}

/// One chat completion request worth of knobs.
#[derive(Clone, Debug)]
pub struct ChatRequest<'a> {
    pub model: &'a str,
    pub system: Option<&'a str>,
    pub user: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the API for a JSON object response
    pub json_mode: bool,
}

/// OpenAI client wrapper.
#[derive(Clone)]
pub struct LlmClient {
    client: Client<OpenAIConfig>,
}

impl LlmClient {
    pub fn new(api_key: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
        }
    }

    /// Run a chat completion, retrying transient failures.
    pub async fn chat(&self, req: ChatRequest<'_>) -> Result<String, LlmError> {
        // JSON mode requires the word "json" somewhere in the messages
        let mut user_prompt = req.user.to_string();
        if req.json_mode && !user_prompt.to_lowercase().contains("json") {
            user_prompt.push_str("\n\nReturn your answer as JSON.");
        }

        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::with_capacity(2);
        if let Some(system) = req.system {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system.to_string()),
                    name: None,
                },
            ));
        }
        messages.push(ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(user_prompt),
                name: None,
            },
        ));

        let request = CreateChatCompletionRequest {
            model: req.model.to_string(),
            messages,
            max_tokens: Some(req.max_tokens),
            temperature: Some(req.temperature),
            response_format: req.json_mode.then_some(ResponseFormat::JsonObject),
            ..Default::default()
        };

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match self.client.chat().create(request.clone()).await {
                Ok(response) => {
                    let content = response
                        .choices
                        .first()
                        .and_then(|choice| choice.message.content.clone())
                        .ok_or(LlmError::Empty)?;
                    let content = content.trim().to_string();
                    debug!(model = req.model, len = content.len(), "LLM response");
                    return Ok(content);
                }
                Err(e) => {
                    warn!(
                        model = req.model,
                        attempt = attempt,
                        error = %e,
                        "LLM call failed, will retry"
                    );
                    last_error = Some(e);
                }
            }

            if attempt < MAX_ATTEMPTS {
                tokio::time::sleep(Duration::from_secs(2 * attempt as u64)).await;
            }
        }

        match last_error {
            Some(e) => Err(LlmError::Api(e)),
            None => Err(LlmError::Empty),
        }
    }
}

fn brace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Objects with at most one level of nesting, same as flat objects
    RE.get_or_init(|| Regex::new(r"\{[^{}]*\{[^{}]*\}[^{}]*\}|\{[^{}]*\}").unwrap())
}

/// Parse a JSON object out of an LLM reply.
///
/// Strategies, in order: direct parse, markdown-fence strip, brace-bounded
/// extraction (last candidate first).
pub fn parse_json_response(content: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(content) {
        if value.is_object() {
            return Some(value);
        }
    }

    let stripped = content
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string();
    if let Ok(value) = serde_json::from_str::<Value>(&stripped) {
        if value.is_object() {
            return Some(value);
        }
    }

    let candidates: Vec<&str> = brace_re()
        .find_iter(content)
        .map(|m| m.as_str())
        .collect();
    for candidate in candidates.iter().rev() {
        let cleaned = candidate.replace(['\n', '\t'], " ");
        if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
            if value.is_object() {
                return Some(value);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_direct_json() {
        let value = parse_json_response(r#"{"url": "https://acme.se"}"#).unwrap();
        assert_eq!(value["url"], "https://acme.se");
    }

    #[test]
    fn test_parse_fenced_json() {
        let content = "```json\n{\"match_score\": 85}\n```";
        let value = parse_json_response(content).unwrap();
        assert_eq!(value["match_score"], 85);
    }

    #[test]
    fn test_parse_embedded_json() {
        let content = "Here is my verdict: {\"match_score\": 40, \"reason\": \"weak fit\"} hope it helps";
        let value = parse_json_response(content).unwrap();
        assert_eq!(value["reason"], "weak fit");
    }

    #[test]
    fn test_parse_nested_json() {
        let content = r#"{"outer": {"inner": 1}, "x": 2}"#;
        let value = parse_json_response(content).unwrap();
        assert_eq!(value["outer"]["inner"], 1);
    }

    #[test]
    fn test_parse_garbage_returns_none() {
        assert!(parse_json_response("no json to be found").is_none());
    }
}
