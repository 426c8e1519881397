//! Lenient JSON decoding for free-text model replies.

use serde_json::Value;

use crate::error::{Error, Result};

/// Characters of the reply quoted in decode errors.
const PREVIEW_CHARS: usize = 120;

/// Decode a model reply that should be JSON.
///
/// Accepts bare JSON, JSON inside a Markdown code fence, and JSON surrounded
/// by prose (the outermost `{...}` or `[...]` span is tried last).
pub fn parse_json_lenient(text: &str) -> Result<Value> {
    let reply = text.trim();

    let first_err = match serde_json::from_str(strip_code_fence(reply)) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    if let Some(span) = outermost_span(reply) {
        if let Ok(value) = serde_json::from_str(span) {
            return Ok(value);
        }
    }

    Err(Error::InvalidResponse(format!(
        "{} (reply starts with {:?})",
        first_err,
        reply.chars().take(PREVIEW_CHARS).collect::<String>()
    )))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.trim_end();
    let rest = rest.strip_suffix("```").unwrap_or(rest);

    // Info string (```json) runs to the first newline, or on a single-line
    // fence up to where the payload opens.
    let body = match rest.split_once('\n') {
        Some((_, body)) => body,
        None => rest
            .find(['{', '[', '"'])
            .map_or(rest, |start| &rest[start..]),
    };
    body.trim()
}

fn outermost_span(text: &str) -> Option<&str> {
    let start = text.find(['{', '['])?;
    let closer = if text[start..].starts_with('{') { '}' } else { ']' };
    let end = text.rfind(closer)?;
    (end > start).then(|| &text[start..=end])
}
