//! Single-pass structured extraction.
//!
//! Compiles the requested record into an instance schema, formats the
//! document, prompts the model and, when citations are on, resolves and
//! strips the citation wrappers in the reply.

mod json;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::citation::{enrich_citations, strip_citations};
use crate::document::{CitationLevel, Document, ExtractionMode};
use crate::error::{Error, Result};
use crate::formatter::{DocumentFormatter, FormatOptions};
use crate::llm::{
    fill_user_prompt, GenerationOptions, LanguageModel, DEFAULT_SYSTEM_PROMPT,
    DEFAULT_USER_PROMPT,
};
use crate::schema::{compile, render, RecordDescriptor};

pub use json::parse_json_lenient;

/// How the model is asked to reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// Free text, decoded leniently.
    #[default]
    Text,
    /// Provider-enforced JSON object.
    Json,
}

/// Per-call extraction knobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionSettings {
    pub citation_level: CitationLevel,
    pub response_mode: ResponseMode,
    pub format: FormatOptions,
}

/// Result of an extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    /// Extracted values with every citation wrapper removed.
    pub response: Value,
    /// The model's reply with citations resolved to bounding boxes; `None`
    /// when citations were off.
    pub response_metadata: Option<Value>,
}

impl Extraction {
    /// Deserialize [`response`](Self::response) into a typed result.
    pub fn into_typed<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.response)?)
    }
}

/// Runs one extraction against an already parsed document.
#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    async fn extract(
        &self,
        document: &Document,
        response_format: &RecordDescriptor,
        llm_options: &GenerationOptions,
        settings: &ExtractionSettings,
        formatter: &dyn DocumentFormatter,
    ) -> Result<Extraction>;
}

/// Extractor for digital PDFs.
pub struct DigitalPdfExtractor {
    llm: Arc<dyn LanguageModel>,
    system_prompt: String,
    user_prompt: String,
}

impl DigitalPdfExtractor {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self {
            llm,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: DEFAULT_USER_PROMPT.to_string(),
        }
    }

    /// Replace the prompts. `user_prompt` uses `{content_text}` and `{schema}`.
    pub fn with_prompts(mut self, system_prompt: &str, user_prompt: &str) -> Self {
        self.system_prompt = system_prompt.to_string();
        self.user_prompt = user_prompt.to_string();
        self
    }
}

#[async_trait]
impl DocumentExtractor for DigitalPdfExtractor {
    async fn extract(
        &self,
        document: &Document,
        response_format: &RecordDescriptor,
        llm_options: &GenerationOptions,
        settings: &ExtractionSettings,
        formatter: &dyn DocumentFormatter,
    ) -> Result<Extraction> {
        if document.extraction_mode != ExtractionMode::SinglePass {
            return Err(Error::Unimplemented(document.extraction_mode));
        }

        let schema = render(&compile(
            response_format,
            settings.citation_level,
            document.include_citations,
        ));
        debug!("Instance schema:\n{}", schema);

        let content_text = formatter.format_document(document, &settings.format)?;
        debug!("Document text: {} chars", content_text.len());
        let user_prompt = fill_user_prompt(&self.user_prompt, &content_text, &schema);

        let response = match settings.response_mode {
            ResponseMode::Text => {
                let text = self
                    .llm
                    .generate_text(&self.system_prompt, &user_prompt, llm_options)
                    .await?;
                parse_json_lenient(&text)?
            }
            ResponseMode::Json => {
                self.llm
                    .generate_json(&self.system_prompt, &user_prompt, llm_options)
                    .await?
            }
        };
        if !response.is_object() {
            return Err(Error::InvalidResponse(format!(
                "expected a JSON object, got {}",
                response
            )));
        }

        let extraction = if document.include_citations {
            let metadata = enrich_citations(&response, document)?;
            Extraction {
                response: strip_citations(&metadata),
                response_metadata: Some(metadata),
            }
        } else {
            Extraction {
                response,
                response_metadata: None,
            }
        };

        info!(
            "Extracted {} fields from {}",
            extraction.response.as_object().map_or(0, |o| o.len()),
            document.uri
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{BoundingBox, Line, Page, ParsedPdf};
    use crate::formatter::DigitalPdfFormatter;
    use crate::llm::LlmError;
    use crate::schema::{FieldDescriptor, FieldType};
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a canned reply and remembers the last prompt.
    struct CannedModel {
        reply: String,
        last_prompt: Mutex<Option<String>>,
    }

    impl CannedModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                last_prompt: Mutex::new(None),
            })
        }

        fn prompt(&self) -> String {
            self.last_prompt.lock().unwrap().clone().unwrap_or_default()
        }
    }

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn generate_text(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
            _options: &GenerationOptions,
        ) -> std::result::Result<String, LlmError> {
            *self.last_prompt.lock().unwrap() = Some(user_prompt.to_string());
            Ok(self.reply.clone())
        }

        async fn generate_json(
            &self,
            system_prompt: &str,
            user_prompt: &str,
            options: &GenerationOptions,
        ) -> std::result::Result<Value, LlmError> {
            let text = self.generate_text(system_prompt, user_prompt, options).await?;
            serde_json::from_str(&text).map_err(|e| LlmError::Parse(e.to_string()))
        }
    }

    fn document() -> Document {
        Document::with_content(
            "invoice.pdf",
            ParsedPdf::new(vec![Page {
                lines: vec![
                    Line {
                        text: "Invoice INV-7".into(),
                        bounding_box: BoundingBox::new(0.1, 0.1, 0.4, 0.12),
                    },
                    Line {
                        text: "Bill to: Zeel".into(),
                        bounding_box: BoundingBox::new(0.1, 0.2, 0.5, 0.22),
                    },
                ],
                width: 612.0,
                height: 792.0,
            }]),
        )
    }

    fn invoice() -> RecordDescriptor {
        RecordDescriptor::new()
            .field(FieldDescriptor::new("number", FieldType::String).description("invoice number"))
            .field(FieldDescriptor::new("customer", FieldType::String))
    }

    async fn run(
        model: Arc<CannedModel>,
        document: &Document,
        settings: &ExtractionSettings,
    ) -> Result<Extraction> {
        DigitalPdfExtractor::new(model)
            .extract(
                document,
                &invoice(),
                &GenerationOptions::default(),
                settings,
                &DigitalPdfFormatter,
            )
            .await
    }

    #[tokio::test]
    async fn test_cited_extraction() {
        let model = CannedModel::new(
            "```json\n{\"number\": {\"value\": \"INV-7\", \"citations\": [{\"page\": 0, \"lines\": [0]}]}, \
             \"customer\": {\"value\": \"Zeel\", \"citations\": [{\"page\": 0, \"lines\": [1]}]}}\n```",
        );
        let extraction = run(model.clone(), &document(), &ExtractionSettings::default())
            .await
            .unwrap();

        assert_eq!(extraction.response, json!({"number": "INV-7", "customer": "Zeel"}));
        let metadata = extraction.response_metadata.unwrap();
        assert_eq!(
            metadata["customer"]["citations"][0]["bboxes"][0],
            json!({"x0": 0.1, "top": 0.2, "x1": 0.5, "bottom": 0.22})
        );

        let prompt = model.prompt();
        assert!(prompt.contains("0: Invoice INV-7"));
        assert!(prompt.contains("\"value\": <string>,  # desc: invoice number"));
    }

    #[tokio::test]
    async fn test_uncited_extraction_in_json_mode() {
        let model = CannedModel::new(r#"{"number": "INV-7", "customer": "Zeel"}"#);
        let mut doc = document();
        doc.include_citations = false;
        let settings = ExtractionSettings {
            response_mode: ResponseMode::Json,
            ..Default::default()
        };

        let extraction = run(model.clone(), &doc, &settings).await.unwrap();
        assert_eq!(extraction.response["customer"], "Zeel");
        assert!(extraction.response_metadata.is_none());
        assert!(!model.prompt().contains("citations"));
        assert!(model.prompt().contains("\nBill to: Zeel\n"));
    }

    #[tokio::test]
    async fn test_multi_pass_is_rejected_before_prompting() {
        let model = CannedModel::new("{}");
        let mut doc = document();
        doc.extraction_mode = ExtractionMode::MultiPass;

        let err = run(model.clone(), &doc, &ExtractionSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unimplemented(ExtractionMode::MultiPass)));
        assert!(model.last_prompt.lock().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_non_object_reply_is_invalid() {
        let model = CannedModel::new("[1, 2, 3]");
        let err = run(model, &document(), &ExtractionSettings::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[test]
    fn test_into_typed() {
        #[derive(Deserialize)]
        struct Invoice {
            number: String,
        }
        let extraction = Extraction {
            response: json!({"number": "INV-7"}),
            response_metadata: None,
        };
        let invoice: Invoice = extraction.into_typed().unwrap();
        assert_eq!(invoice.number, "INV-7");
    }
}
