//! Prompt text for a parsed document.
//!
//! Each page becomes `<page number=N>\n...\n</page>`, pages joined by a blank
//! line. With citations on, every line is prefixed by its zero-based index on
//! the page (`3: Total due`); those are the indices the model cites back and
//! [`crate::citation::enrich_citations`] resolves.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::document::{Document, ExtractionMode, Page};
use crate::error::{Error, Result};

/// Caller-controlled formatting knobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatOptions {
    /// Zero-based page indices to include. `None` or empty means all pages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_numbers: Option<Vec<usize>>,
}

impl FormatOptions {
    pub fn pages(page_numbers: impl IntoIterator<Item = usize>) -> Self {
        Self {
            page_numbers: Some(page_numbers.into_iter().collect()),
        }
    }

    /// Sorted, de-duplicated selection, or `None` for all pages.
    fn selection(&self) -> Option<Vec<usize>> {
        let mut pages = self.page_numbers.clone().filter(|p| !p.is_empty())?;
        pages.sort_unstable();
        pages.dedup();
        Some(pages)
    }
}

/// Turns a parsed document into the text placed in the prompt.
pub trait DocumentFormatter: Send + Sync {
    fn format_document(&self, document: &Document, options: &FormatOptions) -> Result<String>;
}

/// Formatter for digital PDFs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DigitalPdfFormatter;

impl DigitalPdfFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl DocumentFormatter for DigitalPdfFormatter {
    fn format_document(&self, document: &Document, options: &FormatOptions) -> Result<String> {
        let content = document.content.as_ref().ok_or_else(|| {
            Error::NotParsed(format!(
                "{}: parse the document before formatting",
                document.uri
            ))
        })?;
        if document.extraction_mode == ExtractionMode::MultiPass {
            return Err(Error::Unimplemented(ExtractionMode::MultiPass));
        }
        if content.pages.is_empty() {
            return Err(Error::NoPages);
        }

        // Page tags keep the index in the full document so citations stay
        // valid against `document.content`.
        let pages: Vec<(usize, &Page)> = match options.selection() {
            Some(selected) => selected
                .into_iter()
                .filter_map(|n| content.pages.get(n).map(|p| (n, p)))
                .collect(),
            None => content.pages.iter().enumerate().collect(),
        };
        if pages.is_empty() {
            return Err(Error::NoPages);
        }
        if options.selection().is_some() {
            info!("Formatting {} of {} pages", pages.len(), content.page_count());
        }

        let line_numbers = document.include_citations;
        let formatted: Vec<String> = pages
            .into_iter()
            .map(|(number, page)| format_page(number, page, line_numbers))
            .collect();
        Ok(formatted.join("\n\n"))
    }
}

fn format_page(number: usize, page: &Page, line_numbers: bool) -> String {
    let mut text = format!("<page number={}>\n", number);
    for (idx, line) in page.lines.iter().enumerate() {
        if line_numbers {
            text.push_str(&format!("{}: {}\n", idx, line.text));
        } else {
            text.push_str(&line.text);
            text.push('\n');
        }
    }
    text.push_str("</page>");
    text
}
