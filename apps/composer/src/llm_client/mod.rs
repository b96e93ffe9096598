//! LLM Client — the single point of entry for calls to the text-improvement model.
//!
//! No other module talks to the Anthropic API directly; the suggestion
//! coordinator only sees the `TextImprover` trait implemented here.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm_client::prompts::{build_improve_prompt, IMPROVE_SYSTEM};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for every improvement request.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;
const MAX_RETRIES: u32 = 3;
const BACKOFF_BASE_MS: u64 = 500;
const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(1);

/// Total sleep between attempts: 500ms, 1s, ...
fn total_backoff() -> Duration {
    Duration::from_millis((1..MAX_RETRIES).map(|n| BACKOFF_BASE_MS << (n - 1)).sum())
}

/// Per-attempt HTTP timeout so that every retry fits inside `budget`.
fn attempt_timeout(budget: Duration) -> Duration {
    (budget.saturating_sub(total_backoff()) / MAX_RETRIES).max(MIN_ATTEMPT_TIMEOUT)
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("suggestion service is not configured (set ANTHROPIC_API_KEY)")]
    NotConfigured,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// Wraps the Anthropic Messages API with retry logic.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    /// `budget` covers a whole `call`, retries and backoff included; each
    /// attempt gets an equal share of it.
    pub fn new(api_key: String, budget: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(attempt_timeout(budget)).build()?,
            api_key,
        })
    }

    /// Sends one prompt and returns the full response object.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Backoff: 500ms, 1s
                let delay = Duration::from_millis(BACKOFF_BASE_MS << (attempt - 1));
                warn!(
                    "Improvement request attempt {} failed, retrying after {}ms",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("Improvement API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                // Try to parse error message
                let message = serde_json::from_str::<AnthropicError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let llm_response: LlmResponse = response.json().await?;

            debug!(
                "Improvement call succeeded: input_tokens={}, output_tokens={}",
                llm_response.usage.input_tokens, llm_response.usage.output_tokens
            );

            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// A remote service that rewrites one piece of CV text more professionally.
#[async_trait]
pub trait TextImprover: Send + Sync {
    async fn improve(&self, text: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl TextImprover for LlmClient {
    async fn improve(&self, text: &str) -> Result<String, LlmError> {
        let prompt = build_improve_prompt(text);
        let response = self.call(&prompt, IMPROVE_SYSTEM).await?;
        let improved = strip_code_fences(response.text().ok_or(LlmError::EmptyContent)?);
        if improved.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        Ok(improved.to_string())
    }
}

/// Stand-in used when no API key is configured: every request fails, which
/// the form surfaces like any other suggestion failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledImprover;

#[async_trait]
impl TextImprover for DisabledImprover {
    async fn improve(&self, _text: &str) -> Result<String, LlmError> {
        Err(LlmError::NotConfigured)
    }
}

/// Strips ```text ... ``` or ``` ... ``` code fences from LLM output.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```text") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences_with_text_tag() {
        let input = "```text\nLed a team of 5 engineers.\n```";
        assert_eq!(strip_code_fences(input), "Led a team of 5 engineers.");
    }

    #[test]
    fn test_strip_code_fences_without_tag() {
        let input = "```\nShipped v2.\n```";
        assert_eq!(strip_code_fences(input), "Shipped v2.");
    }

    #[test]
    fn test_strip_code_fences_no_fences() {
        let input = "  Plain answer.  ";
        assert_eq!(strip_code_fences(input), "Plain answer.");
    }

    #[test]
    fn test_response_text_picks_first_text_block() {
        let response: LlmResponse = serde_json::from_str(
            r#"{"content":[{"type":"tool_use"},{"type":"text","text":"Better."}],
                "usage":{"input_tokens":3,"output_tokens":2}}"#,
        )
        .unwrap();
        assert_eq!(response.text(), Some("Better."));
    }

    #[test]
    fn test_attempts_share_the_budget() {
        assert_eq!(total_backoff(), Duration::from_millis(1500));
        let budget = Duration::from_secs(30);
        let per_attempt = attempt_timeout(budget);
        assert_eq!(per_attempt, Duration::from_millis(9500));
        assert!(per_attempt * MAX_RETRIES + total_backoff() <= budget);
    }

    #[test]
    fn test_attempt_timeout_has_a_floor() {
        assert_eq!(attempt_timeout(Duration::from_secs(2)), MIN_ATTEMPT_TIMEOUT);
    }

    #[tokio::test]
    async fn test_disabled_improver_always_fails() {
        let err = DisabledImprover.improve("anything").await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured));
    }
}
