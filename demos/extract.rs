//! Extract an invoice from a PDF and print the result with its citations.
//!
//! ```sh
//! cargo run --example extract -- invoice.pdf [schema.json] [config.toml]
//! ```
//!
//! Without a schema file a small built-in invoice record is used. The model
//! endpoint comes from the config file or `LLM_*` environment variables.

use std::path::Path;
use std::sync::Arc;

use doc_intel::llm::{GenerationOptions, LlmClient};
use doc_intel::processor::{DocumentProcessor, ExtractRequest};
use doc_intel::schema::{canonicalize, compile, FieldDescriptor, FieldType, RecordDescriptor};
use doc_intel::{CitationLevel, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn invoice_schema() -> RecordDescriptor {
    let item = RecordDescriptor::new()
        .field(FieldDescriptor::new("description", FieldType::String))
        .field(FieldDescriptor::new("quantity", FieldType::Integer))
        .field(FieldDescriptor::new("amount", FieldType::Number).description("line total"));

    RecordDescriptor::new()
        .field(
            FieldDescriptor::new("invoice_no", FieldType::String)
                .description("invoice number as printed")
                .examples(["INV-0042"]),
        )
        .field(FieldDescriptor::new("issued", FieldType::Date))
        .field(FieldDescriptor::new("customer", FieldType::String).description("billed party"))
        .field(FieldDescriptor::new("items", FieldType::list(FieldType::Record(item))).default_factory())
        .field(FieldDescriptor::new("total", FieldType::Number))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_intel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let pdf = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: extract <file.pdf> [schema.json] [config.toml]"))?;
    let schema = match args.next() {
        Some(path) => RecordDescriptor::from_json_str(&std::fs::read_to_string(path)?)?,
        None => invoice_schema(),
    };
    let config = match args.next() {
        Some(path) => Config::load(Path::new(&path)).await?,
        None => Config::from_env(),
    };

    println!(
        "Expected shape:\n{}",
        canonicalize(&compile(&schema, CitationLevel::Line, false))?
    );

    let llm = Arc::new(LlmClient::new(config.llm.clone())?);
    if !llm.is_available().await {
        anyhow::bail!("LLM endpoint {} is not reachable", config.llm.endpoint);
    }

    let mut processor = DocumentProcessor::from_config(pdf, llm, config.extraction);
    let request = ExtractRequest::new(schema).with_llm_config(GenerationOptions::default());
    let extraction = processor.extract(request).await?;

    println!("{}", serde_json::to_string_pretty(&extraction.response)?);
    if let Some(metadata) = extraction.response_metadata {
        println!("{}", serde_json::to_string_pretty(&metadata)?);
    }
    Ok(())
}
