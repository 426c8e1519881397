//! Parsed document model.
//!
//! A [`Document`] is created per source URI, filled with a [`ParsedPdf`] by a
//! parser, and read (never mutated) by the formatter and citation engine.

mod geometry;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use geometry::{denormalize_bounding_box, normalize_bounding_box, BoundingBox};

/// One line of text on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub text: String,
    /// Normalized (0-1) against the owning page's width and height.
    pub bounding_box: BoundingBox,
}

/// A single page with its lines in reading order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub lines: Vec<Line>,
    /// Page width in PDF points.
    pub width: f64,
    /// Page height in PDF points.
    pub height: f64,
}

/// Page/line structure of a digital PDF.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedPdf {
    #[serde(default)]
    pub pages: Vec<Page>,
}

impl ParsedPdf {
    pub fn new(pages: Vec<Page>) -> Self {
        Self { pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total number of lines across all pages.
    pub fn line_count(&self) -> usize {
        self.pages.iter().map(|p| p.lines.len()).sum()
    }

    /// Bounding box of `line` on `page`, if both indices are in range.
    pub fn line_bbox(&self, page: usize, line: usize) -> Option<&BoundingBox> {
        self.pages
            .get(page)
            .and_then(|p| p.lines.get(line))
            .map(|l| &l.bounding_box)
    }
}

/// How the extractor talks to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Whole document in one prompt.
    #[default]
    SinglePass,
    /// Not implemented; always rejected.
    MultiPass,
}

impl ExtractionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMode::SinglePass => "single_pass",
            ExtractionMode::MultiPass => "multi_pass",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "single_pass" | "single-pass" => Some(ExtractionMode::SinglePass),
            "multi_pass" | "multi-pass" => Some(ExtractionMode::MultiPass),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExtractionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Granularity of the citation template handed to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationLevel {
    /// `{"page": <integer>}`
    Page,
    /// `{"page": <integer>, "lines": [<integer>]}`
    #[default]
    Line,
}

/// A source document and everything learned about it during extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub uri: String,
    /// `None` until a parser has run.
    #[serde(default)]
    pub content: Option<ParsedPdf>,
    #[serde(default = "default_include_citations")]
    pub include_citations: bool,
    #[serde(default)]
    pub extraction_mode: ExtractionMode,
    /// Plain extracted values from the last extraction.
    #[serde(default)]
    pub response: Option<Value>,
    /// Citation-enriched tree from the last extraction.
    #[serde(default)]
    pub response_metadata: Option<Value>,
}

fn default_include_citations() -> bool {
    true
}

impl Document {
    /// A new, unparsed document.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            content: None,
            include_citations: default_include_citations(),
            extraction_mode: ExtractionMode::default(),
            response: None,
            response_metadata: None,
        }
    }

    /// A document that already carries parsed content.
    pub fn with_content(uri: impl Into<String>, content: ParsedPdf) -> Self {
        Self {
            content: Some(content),
            ..Self::new(uri)
        }
    }

    pub fn is_parsed(&self) -> bool {
        self.content.is_some()
    }
}
