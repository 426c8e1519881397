//! HTTP client for Ollama and OpenAI-compatible chat APIs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::config::{LlmConfig, LlmProvider};
use super::retry::{parse_retry_after, retry_with_backoff};
use super::{GenerationOptions, LanguageModel, LlmError};

/// LLM client used by the extractor.
pub struct LlmClient {
    config: LlmConfig,
    client: Client,
}

/// Ollama API request format.
#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

/// Ollama API response format.
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// OpenAI chat completion request format.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Resolved parameters for a single call.
struct CallParams<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    json: bool,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Connection(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Get the config.
    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Check if the LLM service is reachable.
    pub async fn is_available(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        let url = match self.config.provider {
            LlmProvider::Ollama => self.url("/api/tags"),
            LlmProvider::OpenAI => self.url("/v1/models"),
        };
        let mut req = self.client.get(&url);
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }
        match req.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.endpoint.trim_end_matches('/'), path)
    }

    fn params<'a>(&'a self, options: &'a GenerationOptions, json: bool) -> CallParams<'a> {
        CallParams {
            model: options.model.as_deref().unwrap_or(&self.config.model),
            temperature: options.temperature.unwrap_or(self.config.temperature),
            max_tokens: options.max_tokens.unwrap_or(self.config.max_tokens),
            json,
        }
    }

    /// Run one completion through the configured provider with retries.
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
        json: bool,
    ) -> Result<String, LlmError> {
        if !self.config.enabled {
            return Err(LlmError::Disabled);
        }
        let params = self.params(options, json);
        debug!(
            "Calling {:?} model {} (json: {}, prompt: {} chars)",
            self.config.provider,
            params.model,
            json,
            user_prompt.len()
        );

        let params = &params;
        retry_with_backoff(self.config.max_attempts, self.config.retry_base_ms, || async move {
            match self.config.provider {
                LlmProvider::Ollama => self.call_ollama(system_prompt, user_prompt, params).await,
                LlmProvider::OpenAI => self.call_openai(system_prompt, user_prompt, params).await,
            }
        })
        .await
    }

    /// Call Ollama's generate endpoint.
    async fn call_ollama(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &CallParams<'_>,
    ) -> Result<String, LlmError> {
        let request = OllamaRequest {
            model: params.model,
            system: system_prompt,
            prompt: user_prompt,
            stream: false,
            format: params.json.then_some("json"),
            options: OllamaOptions {
                temperature: params.temperature,
                num_predict: params.max_tokens,
            },
        };

        let resp = self
            .client
            .post(self.url("/api/generate"))
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        let resp = check_status(resp).await?;

        let ollama_resp: OllamaResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(ollama_resp.response)
    }

    /// Call an OpenAI-compatible chat completions endpoint.
    async fn call_openai(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &CallParams<'_>,
    ) -> Result<String, LlmError> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| LlmError::MissingApiKey(self.config.endpoint.clone()))?;

        let request = ChatRequest {
            model: params.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
            response_format: params.json.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let resp = self
            .client
            .post(self.url("/v1/chat/completions"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Connection(e.to_string()))?;
        let resp = check_status(resp).await?;

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::Parse("response has no message content".to_string()))
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate_text(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        self.complete(system_prompt, user_prompt, options, false)
            .await
    }

    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Value, LlmError> {
        let text = self
            .complete(system_prompt, user_prompt, options, true)
            .await?;
        serde_json::from_str(text.trim()).map_err(|e| LlmError::Parse(e.to_string()))
    }
}

/// Map non-success statuses to [`LlmError`].
async fn check_status(resp: Response) -> Result<Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok());
        return Err(LlmError::RateLimited {
            retry_after_secs: parse_retry_after(retry_after).map(|d| d.as_secs()),
        });
    }
    let body = resp.text().await.unwrap_or_default();
    Err(LlmError::Api {
        status: status.as_u16(),
        body,
    })
}
