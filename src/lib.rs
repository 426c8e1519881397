//! doc-intel - schema-driven structured extraction from PDF documents.
//!
//! Parses a digital PDF into pages and lines, prompts a language model with
//! the document text and an instance schema compiled from a
//! [`RecordDescriptor`](schema::RecordDescriptor), and maps the line-level
//! citations in the reply back to bounding boxes on the page.
//!
//! ```no_run
//! use std::sync::Arc;
//! use doc_intel::llm::{LlmClient, LlmConfig};
//! use doc_intel::processor::{DocumentProcessor, ExtractRequest};
//! use doc_intel::schema::{FieldDescriptor, FieldType, RecordDescriptor};
//!
//! # async fn run() -> doc_intel::Result<()> {
//! let llm = Arc::new(LlmClient::new(LlmConfig::default().with_env_overrides())?);
//! let mut processor = DocumentProcessor::from_digital_pdf("invoice.pdf", llm);
//!
//! let invoice = RecordDescriptor::new()
//!     .field(FieldDescriptor::new("invoice_no", FieldType::String))
//!     .field(FieldDescriptor::new("total", FieldType::Number));
//! let extraction = processor.extract(ExtractRequest::new(invoice)).await?;
//! println!("{}", extraction.response);
//! # Ok(())
//! # }
//! ```

// Inherent `from_str` helpers return Option rather than implementing FromStr.
#![allow(clippy::should_implement_trait)]

pub mod citation;
pub mod config;
pub mod document;
pub mod error;
pub mod extractor;
pub mod formatter;
pub mod llm;
pub mod parser;
pub mod processor;
pub mod schema;

pub use config::Config;
pub use document::{CitationLevel, Document, ExtractionMode, ParsedPdf};
pub use error::{Error, Result};
pub use extractor::Extraction;
pub use processor::{DocumentProcessor, ExtractRequest, ExtractionOverrides};
pub use schema::{FieldDescriptor, FieldType, RecordDescriptor, ResponseSchema};
