//! Facade sequencing parse → format → extract for one document.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ExtractionDefaults;
use crate::document::{CitationLevel, Document, ExtractionMode, ParsedPdf};
use crate::error::{Error, Result};
use crate::extractor::{
    DigitalPdfExtractor, DocumentExtractor, Extraction, ExtractionSettings, ResponseMode,
};
use crate::formatter::{DigitalPdfFormatter, DocumentFormatter, FormatOptions};
use crate::llm::{GenerationOptions, LanguageModel, DEFAULT_SYSTEM_PROMPT, DEFAULT_USER_PROMPT};
use crate::parser::{DigitalPdfParser, DocumentParser};
use crate::schema::{RecordDescriptor, ResponseSchema};

/// Per-request overrides of the extraction defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_citations: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_mode: Option<ExtractionMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_numbers: Option<Vec<usize>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_level: Option<CitationLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mode: Option<ResponseMode>,
}

/// Everything one `extract` call needs besides the document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractRequest {
    /// Shape of the result. Required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<RecordDescriptor>,
    pub llm_config: GenerationOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_config: Option<ExtractionOverrides>,
}

impl ExtractRequest {
    pub fn new(response_format: RecordDescriptor) -> Self {
        Self {
            response_format: Some(response_format),
            ..Self::default()
        }
    }

    /// Parse a request from JSON. Unknown keys are rejected.
    pub fn from_json(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    pub fn with_llm_config(mut self, llm_config: GenerationOptions) -> Self {
        self.llm_config = llm_config;
        self
    }

    pub fn with_overrides(mut self, overrides: ExtractionOverrides) -> Self {
        self.extraction_config = Some(overrides);
        self
    }
}

/// Owns one document and the components that process it.
pub struct DocumentProcessor {
    parser: Arc<dyn DocumentParser>,
    formatter: Box<dyn DocumentFormatter>,
    extractor: Box<dyn DocumentExtractor>,
    defaults: ExtractionDefaults,
    pub document: Document,
}

impl DocumentProcessor {
    pub fn new(
        document: Document,
        parser: Box<dyn DocumentParser>,
        formatter: Box<dyn DocumentFormatter>,
        extractor: Box<dyn DocumentExtractor>,
    ) -> Self {
        Self {
            parser: Arc::from(parser),
            formatter,
            extractor,
            defaults: ExtractionDefaults::default(),
            document,
        }
    }

    /// Processor for a digital PDF at `uri`, using the default components.
    pub fn from_digital_pdf(uri: impl Into<String>, llm: Arc<dyn LanguageModel>) -> Self {
        Self::new(
            Document::new(uri),
            Box::new(DigitalPdfParser::new()),
            Box::new(DigitalPdfFormatter::new()),
            Box::new(DigitalPdfExtractor::new(llm)),
        )
    }

    /// Like [`from_digital_pdf`](Self::from_digital_pdf), with prompts and
    /// defaults taken from configuration.
    pub fn from_config(
        uri: impl Into<String>,
        llm: Arc<dyn LanguageModel>,
        defaults: ExtractionDefaults,
    ) -> Self {
        let mut extractor = DigitalPdfExtractor::new(llm);
        if defaults.system_prompt.is_some() || defaults.user_prompt.is_some() {
            extractor = extractor.with_prompts(
                defaults
                    .system_prompt
                    .as_deref()
                    .unwrap_or(DEFAULT_SYSTEM_PROMPT),
                defaults.user_prompt.as_deref().unwrap_or(DEFAULT_USER_PROMPT),
            );
        }
        Self::new(
            Document::new(uri),
            Box::new(DigitalPdfParser::new()),
            Box::new(DigitalPdfFormatter::new()),
            Box::new(extractor),
        )
        .with_defaults(defaults)
    }

    /// Apply extraction defaults; the document's citation and mode flags are
    /// reset from them.
    pub fn with_defaults(mut self, defaults: ExtractionDefaults) -> Self {
        self.document.include_citations = defaults.include_citations;
        self.document.extraction_mode = defaults.extraction_mode;
        self.defaults = defaults;
        self
    }

    /// Parse the source and store the result on the document.
    ///
    /// Blocks while the parser runs (`pdftotext` for digital PDFs). Async
    /// callers should use [`parse_async`](Self::parse_async).
    pub fn parse(&mut self) -> Result<&Document> {
        let content = self.parser.parse(&self.document.uri)?;
        Ok(self.store_content(content))
    }

    /// Parse on the blocking thread pool and store the result on the document.
    pub async fn parse_async(&mut self) -> Result<&Document> {
        let parser = Arc::clone(&self.parser);
        let uri = self.document.uri.clone();
        debug!("Parsing {} on the blocking pool", uri);
        let content = tokio::task::spawn_blocking(move || parser.parse(&uri)).await??;
        Ok(self.store_content(content))
    }

    fn store_content(&mut self, content: ParsedPdf) -> &Document {
        info!(
            "Parsed {}: {} pages",
            self.document.uri,
            content.page_count()
        );
        self.document.content = Some(content);
        &self.document
    }

    /// Run an extraction, parsing first if needed.
    ///
    /// The response and its citation metadata are stored on the document as
    /// well as returned.
    pub async fn extract(&mut self, request: ExtractRequest) -> Result<Extraction> {
        let ExtractRequest {
            response_format,
            llm_config,
            extraction_config,
        } = request;
        let response_format = response_format.ok_or(Error::MissingResponseFormat)?;
        let overrides = extraction_config.unwrap_or_default();

        if let Some(include_citations) = overrides.include_citations {
            self.document.include_citations = include_citations;
        }
        if let Some(mode) = overrides.extraction_mode {
            self.document.extraction_mode = mode;
        }
        let settings = ExtractionSettings {
            citation_level: overrides
                .citation_level
                .unwrap_or(self.defaults.citation_level),
            response_mode: overrides
                .response_mode
                .unwrap_or(self.defaults.response_mode),
            format: FormatOptions {
                page_numbers: overrides.page_numbers,
            },
        };

        if !self.document.is_parsed() {
            self.parse_async().await?;
        }

        let extraction = self
            .extractor
            .extract(
                &self.document,
                &response_format,
                &llm_config,
                &settings,
                &*self.formatter,
            )
            .await?;

        self.document.response = Some(extraction.response.clone());
        self.document.response_metadata = extraction.response_metadata.clone();
        Ok(extraction)
    }

    /// Extract into a typed result whose schema comes from `T`.
    ///
    /// Returns the typed value and the citation metadata, if any.
    pub async fn extract_as<T>(
        &mut self,
        llm_config: GenerationOptions,
        overrides: Option<ExtractionOverrides>,
    ) -> Result<(T, Option<Value>)>
    where
        T: ResponseSchema + DeserializeOwned,
    {
        let request = ExtractRequest {
            response_format: Some(T::record_descriptor()),
            llm_config,
            extraction_config: overrides,
        };
        let extraction = self.extract(request).await?;
        let metadata = extraction.response_metadata.clone();
        Ok((extraction.into_typed()?, metadata))
    }
}
