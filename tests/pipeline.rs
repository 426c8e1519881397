//! Pipeline Tests
//!
//! Drives `DocumentProcessor` end to end with an in-memory parser and a
//! scripted language model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use doc_intel::document::{BoundingBox, Line, Page};
use doc_intel::extractor::{DigitalPdfExtractor, ResponseMode};
use doc_intel::formatter::DigitalPdfFormatter;
use doc_intel::llm::{GenerationOptions, LanguageModel, LlmError};
use doc_intel::parser::{DocumentParser, ParseError};
use doc_intel::processor::{DocumentProcessor, ExtractRequest, ExtractionOverrides};
use doc_intel::schema::{FieldDescriptor, FieldType, RecordDescriptor, ResponseSchema};
use doc_intel::{CitationLevel, Document, Error, ExtractionMode, ParsedPdf};
use serde::Deserialize;
use serde_json::{json, Value};

/// Replies with a fixed text and records every call.
struct ScriptedModel {
    reply: String,
    prompts: Mutex<Vec<String>>,
    options: Mutex<Vec<GenerationOptions>>,
}

impl ScriptedModel {
    fn new(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate_text(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        self.options.lock().unwrap().push(options.clone());
        Ok(self.reply.clone())
    }

    async fn generate_json(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: &GenerationOptions,
    ) -> Result<Value, LlmError> {
        let text = self.generate_text(system_prompt, user_prompt, options).await?;
        serde_json::from_str(&text).map_err(|e| LlmError::Parse(e.to_string()))
    }
}

/// Serves a fixed two-page invoice and counts parses.
struct InMemoryParser {
    parses: Arc<AtomicUsize>,
}

impl DocumentParser for InMemoryParser {
    fn parse(&self, _uri: &str) -> Result<ParsedPdf, ParseError> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        let line = |text: &str, top: f64| Line {
            text: text.to_string(),
            bounding_box: BoundingBox::new(0.1, top, 0.6, top + 0.25),
        };
        Ok(ParsedPdf::new(vec![
            Page {
                lines: vec![line("ACME Corp invoice", 0.0), line("Number: INV-7", 0.25)],
                width: 612.0,
                height: 792.0,
            },
            Page {
                lines: vec![line("Total due: 40.50", 0.5)],
                width: 612.0,
                height: 792.0,
            },
        ]))
    }
}

fn processor(model: Arc<ScriptedModel>) -> (DocumentProcessor, Arc<AtomicUsize>) {
    let parses = Arc::new(AtomicUsize::new(0));
    let processor = DocumentProcessor::new(
        Document::new("memory://invoice.pdf"),
        Box::new(InMemoryParser {
            parses: parses.clone(),
        }),
        Box::new(DigitalPdfFormatter),
        Box::new(DigitalPdfExtractor::new(model)),
    );
    (processor, parses)
}

#[derive(Debug, Deserialize, PartialEq)]
struct Invoice {
    number: String,
    total: f64,
}

impl ResponseSchema for Invoice {
    fn record_descriptor() -> RecordDescriptor {
        RecordDescriptor::new()
            .field(FieldDescriptor::new("number", FieldType::String).examples(["INV-1"]))
            .field(FieldDescriptor::new("total", FieldType::Number))
    }
}

const CITED_REPLY: &str = r#"Sure! Here is the JSON:
```json
{
  "number": {"value": "INV-7", "citations": [{"page": 0, "lines": [1]}]},
  "total": {"value": 40.5, "citations": [{"page": 1, "lines": [0, 7]}]}
}
```"#;

#[tokio::test]
async fn test_extract_parses_prompts_and_enriches() {
    let model = ScriptedModel::new(CITED_REPLY);
    let (mut processor, parses) = processor(model.clone());

    let extraction = processor
        .extract(ExtractRequest::new(Invoice::record_descriptor()))
        .await
        .unwrap();

    assert_eq!(parses.load(Ordering::SeqCst), 1);
    assert_eq!(extraction.response, json!({"number": "INV-7", "total": 40.5}));

    let metadata = extraction.response_metadata.clone().unwrap();
    assert_eq!(
        metadata["total"]["citations"][0],
        json!({"page": 1, "bboxes": [{"x0": 0.1, "top": 0.5, "x1": 0.6, "bottom": 0.75}]})
    );

    // Stored on the document too.
    assert_eq!(processor.document.response, Some(extraction.response));
    assert_eq!(processor.document.response_metadata, Some(metadata));

    let prompt = model.last_prompt();
    assert!(prompt.contains("<page number=0>\n0: ACME Corp invoice\n1: Number: INV-7\n</page>"));
    assert!(prompt.contains("\"value\": <string>,  # examples: [\"INV-1\"]"));
    assert!(prompt.contains("\"lines\": [<integer>]"));
}

#[tokio::test]
async fn test_second_extract_reuses_parsed_content() {
    let model = ScriptedModel::new(CITED_REPLY);
    let (mut processor, parses) = processor(model.clone());

    processor.parse().unwrap();
    processor
        .extract(ExtractRequest::new(Invoice::record_descriptor()))
        .await
        .unwrap();
    processor
        .extract(ExtractRequest::new(Invoice::record_descriptor()))
        .await
        .unwrap();

    assert_eq!(parses.load(Ordering::SeqCst), 1);
    assert_eq!(model.calls(), 2);
}

#[tokio::test]
async fn test_parse_async_stores_content() {
    let model = ScriptedModel::new("{}");
    let (mut processor, parses) = processor(model);

    let document = processor.parse_async().await.unwrap();
    assert_eq!(document.content.as_ref().map(ParsedPdf::page_count), Some(2));
    assert_eq!(parses.load(Ordering::SeqCst), 1);
}

/// A parser that panics, as a crashed background task would.
struct PanickingParser;

impl DocumentParser for PanickingParser {
    fn parse(&self, _uri: &str) -> Result<ParsedPdf, ParseError> {
        panic!("layout reader crashed");
    }
}

#[tokio::test]
async fn test_panicking_parser_surfaces_as_task_error() {
    let model = ScriptedModel::new("{}");
    let mut processor = DocumentProcessor::new(
        Document::new("memory://broken.pdf"),
        Box::new(PanickingParser),
        Box::new(DigitalPdfFormatter),
        Box::new(DigitalPdfExtractor::new(model.clone())),
    );

    let err = processor
        .extract(ExtractRequest::new(Invoice::record_descriptor()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Task(_)));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_extract_as_typed_result() {
    let model = ScriptedModel::new(CITED_REPLY);
    let (mut processor, _) = processor(model);

    let (invoice, metadata) = processor
        .extract_as::<Invoice>(GenerationOptions::default(), None)
        .await
        .unwrap();
    assert_eq!(
        invoice,
        Invoice {
            number: "INV-7".into(),
            total: 40.5
        }
    );
    assert!(metadata.is_some());
}

#[tokio::test]
async fn test_overrides_reach_formatter_and_model() {
    let model = ScriptedModel::new(r#"{"number": "INV-7", "total": 40.5}"#);
    let (mut processor, _) = processor(model.clone());

    let request = ExtractRequest::new(Invoice::record_descriptor())
        .with_llm_config(GenerationOptions::default().with_model("qwen2.5:7b"))
        .with_overrides(ExtractionOverrides {
            include_citations: Some(false),
            page_numbers: Some(vec![1]),
            response_mode: Some(ResponseMode::Json),
            ..Default::default()
        });
    let extraction = processor.extract(request).await.unwrap();

    assert!(extraction.response_metadata.is_none());
    assert!(!processor.document.include_citations);

    let prompt = model.last_prompt();
    assert!(prompt.contains("<page number=1>\nTotal due: 40.50\n</page>"));
    assert!(!prompt.contains("page number=0"));
    assert!(!prompt.contains("citations"));
    assert_eq!(
        model.options.lock().unwrap()[0].model.as_deref(),
        Some("qwen2.5:7b")
    );
}

#[tokio::test]
async fn test_page_level_citations_pass_through() {
    let reply = r#"{"number": {"value": "INV-7", "citations": [{"page": 0}]},
                    "total": {"value": 40.5, "citations": [{"page": 1}]}}"#;
    let model = ScriptedModel::new(reply);
    let (mut processor, _) = processor(model.clone());

    let request = ExtractRequest::new(Invoice::record_descriptor()).with_overrides(
        ExtractionOverrides {
            citation_level: Some(CitationLevel::Page),
            ..Default::default()
        },
    );
    let extraction = processor.extract(request).await.unwrap();

    assert_eq!(extraction.response, json!({"number": "INV-7", "total": 40.5}));
    assert_eq!(
        extraction.response_metadata.unwrap()["number"]["citations"],
        json!([{"page": 0}])
    );
    assert!(!model.last_prompt().contains("\"lines\""));
}

#[tokio::test]
async fn test_missing_response_format() {
    let model = ScriptedModel::new("{}");
    let (mut processor, parses) = processor(model.clone());

    let err = processor.extract(ExtractRequest::default()).await.unwrap_err();
    assert!(matches!(err, Error::MissingResponseFormat));
    assert_eq!(parses.load(Ordering::SeqCst), 0);
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_multi_pass_fails_without_calling_model() {
    let model = ScriptedModel::new("{}");
    let (mut processor, _) = processor(model.clone());

    let request = ExtractRequest::new(Invoice::record_descriptor()).with_overrides(
        ExtractionOverrides {
            extraction_mode: Some(ExtractionMode::MultiPass),
            ..Default::default()
        },
    );
    let err = processor.extract(request).await.unwrap_err();
    assert!(matches!(err, Error::Unimplemented(ExtractionMode::MultiPass)));
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn test_unknown_request_key_is_invalid_config() {
    let err = ExtractRequest::from_json(json!({
        "response_format": {"fields": []},
        "extraction_config": {"include_citations": true, "chunk_size": 4}
    }))
    .unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(ref m) if m.contains("chunk_size")));
}

#[tokio::test]
async fn test_unparseable_reply() {
    let model = ScriptedModel::new("I'm sorry, I can't read this invoice.");
    let (mut processor, _) = processor(model);

    let err = processor
        .extract(ExtractRequest::new(Invoice::record_descriptor()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidResponse(_)));
    assert!(processor.document.response.is_none());
}
