//! Configuration loading.
//!
//! A config file (TOML, or JSON by extension) holds an `[llm]` table for the
//! model client and an `[extraction]` table for pipeline defaults. Environment
//! variables (and a `.env` file, via dotenvy) override the LLM settings.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::document::{CitationLevel, ExtractionMode};
use crate::extractor::ResponseMode;
use crate::llm::LlmConfig;

/// Errors while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Defaults applied to every extraction unless a request overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionDefaults {
    pub include_citations: bool,
    pub extraction_mode: ExtractionMode,
    pub citation_level: CitationLevel,
    pub response_mode: ResponseMode,
    /// Custom system prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Custom user prompt (uses {content_text} and {schema} placeholders)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
}

impl Default for ExtractionDefaults {
    fn default() -> Self {
        Self {
            include_citations: true,
            extraction_mode: ExtractionMode::SinglePass,
            citation_level: CitationLevel::Line,
            response_mode: ResponseMode::Text,
            system_prompt: None,
            user_prompt: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub extraction: ExtractionDefaults,
}

impl Config {
    /// Defaults plus `.env` and environment overrides.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }
        Self::default().with_env_overrides()
    }

    /// Load configuration from a file, then apply environment overrides.
    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load_file(path).await?;
        if let Ok(env_path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", env_path.display());
        }
        Ok(config.with_env_overrides())
    }

    /// Load configuration from a file without consulting the environment.
    pub async fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
        let config: Config = match ext {
            "json" => serde_json::from_str(&contents)?,
            _ => toml::from_str(&contents)?,
        };
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn with_env_overrides(mut self) -> Self {
        self.llm = self.llm.with_env_overrides();
        self
    }
}
