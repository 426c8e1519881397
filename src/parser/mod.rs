//! PDF parsing into pages and lines.
//!
//! Uses `pdftotext -bbox-layout` (Poppler) to get per-line text and
//! geometry, then normalizes every box against its page size.

mod bbox_layout;

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;
use tracing::{debug, info};

use crate::document::ParsedPdf;

pub use bbox_layout::parse_bbox_layout;

const PDFTOTEXT_HINT: &str = "pdftotext (install poppler-utils)";

/// Errors that can occur while parsing a document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Malformed layout: {0}")]
    InvalidLayout(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Produces a [`ParsedPdf`] from a source URI.
pub trait DocumentParser: Send + Sync {
    fn parse(&self, uri: &str) -> Result<ParsedPdf, ParseError>;
}

/// Parser for PDFs with an embedded text layer.
#[derive(Debug, Clone, Default)]
pub struct DigitalPdfParser;

impl DigitalPdfParser {
    pub fn new() -> Self {
        Self
    }

    /// Run `pdftotext -bbox-layout` and return its XHTML output.
    fn run_pdftotext_bbox(&self, path: &Path) -> Result<String, ParseError> {
        let output = Command::new("pdftotext")
            .args(["-bbox-layout", "-enc", "UTF-8"])
            .arg(path)
            .arg("-")
            .output();

        handle_cmd_output(output, PDFTOTEXT_HINT, "pdftotext -bbox-layout failed")
    }
}

impl DocumentParser for DigitalPdfParser {
    fn parse(&self, uri: &str) -> Result<ParsedPdf, ParseError> {
        let path = local_path(uri);
        if !path.exists() {
            return Err(ParseError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} does not exist", path.display()),
            )));
        }

        debug!("Running pdftotext on {}", path.display());
        let xhtml = self.run_pdftotext_bbox(&path)?;
        let parsed = parse_bbox_layout(&xhtml)?;

        info!(
            "Parsed {}: {} pages, {} lines",
            path.display(),
            parsed.page_count(),
            parsed.line_count()
        );
        Ok(parsed)
    }
}

/// Map a `file://` URI or plain path to a filesystem path.
fn local_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

/// Handle command output, extracting stdout on success or returning appropriate error.
fn handle_cmd_output(
    result: std::io::Result<std::process::Output>,
    tool_name: &str,
    error_prefix: &str,
) -> Result<String, ParseError> {
    match result {
        Ok(output) => {
            if output.status.success() {
                Ok(String::from_utf8_lossy(&output.stdout).to_string())
            } else {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(ParseError::ExtractionFailed(format!(
                    "{}: {}",
                    error_prefix,
                    stderr.trim()
                )))
            }
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ParseError::ToolNotFound(tool_name.to_string()))
        }
        Err(e) => Err(ParseError::Io(e)),
    }
}
