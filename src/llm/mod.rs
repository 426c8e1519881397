//! Language model collaborator.
//!
//! The extractor only sees [`LanguageModel`]; [`LlmClient`] is the HTTP
//! implementation for Ollama and OpenAI-compatible APIs. Retries happen here
//! and nowhere else in the pipeline.

mod client;
mod config;
mod prompts;
mod retry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use client::LlmClient;
pub use config::{LlmConfig, LlmProvider};
pub use prompts::{fill_user_prompt, DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT};
pub use retry::{backoff_delay, parse_retry_after, retry_with_backoff};

/// Per-call overrides of [`LlmConfig`]. Unset fields fall back to the client
/// configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A text generator the extractor can prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Free-form completion.
    async fn generate_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError>;

    /// Completion constrained to a JSON object, decoded before returning.
    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Value, LlmError>;
}

/// Errors that can occur during LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Rate limited (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("LLM is disabled")]
    Disabled,

    #[error("API key not set for {0}")]
    MissingApiKey(String),
}

impl LlmError {
    /// Connection failures, rate limits and server errors may succeed later.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Connection(_) | LlmError::RateLimited { .. } => true,
            LlmError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
