//! Prompt templates for structured extraction.

/// Default system prompt for extraction calls.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "Act as an expert in the field of document extraction and information extraction from documents.";

/// Default user prompt. Uses `{content_text}` and `{schema}` placeholders.
pub const DEFAULT_USER_PROMPT: &str = r#"Your job is to extract structured data mentioned in the schema from the document given below.

DOCUMENT:
{content_text}

OUTPUT SCHEMA:
{schema}

Generate output in JSON format."#;

/// Fill a user prompt template.
///
/// `{schema}` is substituted first so that braces inside the document text
/// are never mistaken for placeholders.
pub fn fill_user_prompt(template: &str, content_text: &str, schema: &str) -> String {
    template
        .replace("{schema}", schema)
        .replacen("{content_text}", content_text, 1)
}
