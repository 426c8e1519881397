//! Crate-level error type.

use thiserror::Error;

use crate::config::ConfigError;
use crate::document::ExtractionMode;
use crate::llm::LlmError;
use crate::parser::ParseError;

/// Errors surfaced by the extraction pipeline.
///
/// Precondition violations (unparsed document, missing response format,
/// unsupported mode) are returned immediately. Bad citation indices coming
/// back from the model are never errors; see [`crate::citation`].
#[derive(Debug, Error)]
pub enum Error {
    #[error("Document not parsed: {0}")]
    NotParsed(String),

    #[error("Document pages are not set")]
    NoPages,

    #[error("Missing response format: provide a record descriptor for the extraction result")]
    MissingResponseFormat,

    #[error("{0} extraction is not implemented yet")]
    Unimplemented(ExtractionMode),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
