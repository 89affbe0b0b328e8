//! Decision-engine capability: given a system prompt, a tool catalog, and a
//! conversation history, the engine returns text and/or tool invocations.
//! The wire shape follows the Anthropic messages API; everything upstream of
//! the `DecisionEngine` trait is engine-agnostic.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use orderly_core::config::EngineConfig;

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("decision engine request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("decision engine returned status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("decision engine credentials are missing: {0}")]
    MissingCredentials(String),
}

/// One tool the engine may invoke: name, description, JSON-schema input spec.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    ToolUse { id: String, name: String, input: Value },
    ToolResult { tool_use_id: String, content: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self { role: Role::User, content: vec![ContentBlock::Text { text: text.into() }] }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Self { role: Role::Assistant, content }
    }

    /// Tool results go back as a single combined user message, in the order
    /// the invocations were received.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Self { role: Role::User, content: results }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
    StopSequence,
    #[serde(other)]
    Other,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: StopReason,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl EngineResponse {
    /// A response with no further tool work requested ends the loop.
    pub fn is_natural_end(&self) -> bool {
        self.stop_reason == StopReason::EndTurn
    }
}

#[async_trait]
pub trait DecisionEngine: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        tools: &[ToolSpec],
        messages: &[Message],
    ) -> Result<EngineResponse, EngineError>;
}

/// HTTP client for an Anthropic-style messages endpoint. Transient failures
/// (timeouts, 429, 5xx) are retried up to `max_retries` times with a short
/// linear backoff.
pub struct HttpEngine {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    model: String,
    max_tokens: u32,
    max_retries: u32,
}

impl HttpEngine {
    pub fn new(http: reqwest::Client, config: &EngineConfig) -> Result<Self, EngineError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            EngineError::MissingCredentials("engine.api_key is not configured".to_string())
        })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn try_complete(
        &self,
        system: &str,
        tools: &[ToolSpec],
        messages: &[Message],
    ) -> Result<EngineResponse, EngineError> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            tools,
            messages,
        };

        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(EngineError::Api { status: status.as_u16(), message });
        }

        Ok(response.json::<EngineResponse>().await?)
    }
}

fn is_retryable(error: &EngineError) -> bool {
    match error {
        EngineError::Http(source) => source.is_timeout() || source.is_connect(),
        EngineError::Api { status, .. } => *status == 429 || *status >= 500,
        EngineError::MissingCredentials(_) => false,
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    tools: &'a [ToolSpec],
    messages: &'a [Message],
}

#[async_trait]
impl DecisionEngine for HttpEngine {
    async fn complete(
        &self,
        system: &str,
        tools: &[ToolSpec],
        messages: &[Message],
    ) -> Result<EngineResponse, EngineError> {
        let mut attempt = 0u32;
        loop {
            match self.try_complete(system, tools, messages).await {
                Err(error) if attempt < self.max_retries && is_retryable(&error) => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %error, "retrying engine request");
                    tokio::time::sleep(std::time::Duration::from_millis(
                        500 * u64::from(attempt),
                    ))
                    .await;
                }
                other => return other,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ContentBlock, EngineResponse, StopReason};

    #[test]
    fn response_decodes_text_and_tool_use_blocks() {
        let payload = json!({
            "content": [
                {"type": "text", "text": "Checking existing orders first."},
                {"type": "tool_use", "id": "toolu_01", "name": "get_existing_orders",
                 "input": {"customer_id": "11111111-1111-1111-1111-111111111111"}}
            ],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 812, "output_tokens": 64}
        });

        let response: EngineResponse = serde_json::from_value(payload).expect("decode");

        assert_eq!(response.stop_reason, StopReason::ToolUse);
        assert!(!response.is_natural_end());
        assert_eq!(response.content.len(), 2);
        assert!(matches!(
            &response.content[1],
            ContentBlock::ToolUse { name, .. } if name == "get_existing_orders"
        ));
        assert_eq!(response.usage.input_tokens, 812);
    }

    #[test]
    fn end_turn_is_a_natural_end() {
        let payload = json!({
            "content": [{"type": "text", "text": "All rows processed."}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        });

        let response: EngineResponse = serde_json::from_value(payload).expect("decode");
        assert!(response.is_natural_end());
    }

    #[test]
    fn unknown_stop_reasons_do_not_fail_decoding() {
        let payload = json!({
            "content": [],
            "stop_reason": "pause_turn",
            "usage": {"input_tokens": 1, "output_tokens": 1}
        });

        let response: EngineResponse = serde_json::from_value(payload).expect("decode");
        assert_eq!(response.stop_reason, StopReason::Other);
    }
}
