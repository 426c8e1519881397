//! Citation enrichment.
//!
//! The model answers with the instance schema filled in, each leaf carrying
//! `citations: [{"page": p, "lines": [l, ...]}]`. [`enrich_citations`]
//! resolves those indices against the parsed document and swaps `lines` for
//! normalized `bboxes`; [`strip_citations`] then reduces every
//! `{value, citations}` wrapper to its bare value.
//!
//! Both walks are structural: any mapping of the right shape anywhere in the
//! tree is treated as a citation (or wrapper), whatever its position.

use serde_json::{Map, Value};
use tracing::debug;

use crate::document::{Document, ParsedPdf};
use crate::error::{Error, Result};
use crate::schema::{BBOXES_KEY, CITATIONS_KEY, LINES_KEY, PAGE_KEY, VALUE_KEY};

/// Resolve every citation in `response` to bounding boxes.
///
/// Fails only if `document` has not been parsed. Out-of-range page indices
/// leave the citation untouched; out-of-range line indices are dropped.
pub fn enrich_citations(response: &Value, document: &Document) -> Result<Value> {
    let parsed = document.content.as_ref().ok_or_else(|| {
        Error::NotParsed(format!(
            "{}: parse the document before enriching citations",
            document.uri
        ))
    })?;

    Ok(enrich_value(response, parsed))
}

/// Replace each `{value, citations}` wrapper with its `value`.
pub fn strip_citations(response: &Value) -> Value {
    match response {
        Value::Object(obj) if is_value_citation_wrapper(obj) => {
            obj.get(VALUE_KEY).cloned().unwrap_or_default()
        }
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), strip_citations(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_citations).collect()),
        other => other.clone(),
    }
}

/// A citation: integer `page` plus a `lines` array.
pub fn is_citation(obj: &Map<String, Value>) -> bool {
    matches!(obj.get(PAGE_KEY), Some(Value::Number(n)) if n.is_i64() || n.is_u64())
        && matches!(obj.get(LINES_KEY), Some(Value::Array(_)))
}

/// A leaf wrapper: exactly the two keys `value` and `citations`.
pub fn is_value_citation_wrapper(obj: &Map<String, Value>) -> bool {
    obj.len() == 2 && obj.contains_key(VALUE_KEY) && obj.contains_key(CITATIONS_KEY)
}

fn enrich_value(value: &Value, parsed: &ParsedPdf) -> Value {
    match value {
        Value::Object(obj) if is_citation(obj) => enrich_citation(obj, parsed),
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| (k.clone(), enrich_value(v, parsed)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(|v| enrich_value(v, parsed)).collect()),
        other => other.clone(),
    }
}

fn enrich_citation(citation: &Map<String, Value>, parsed: &ParsedPdf) -> Value {
    let page = citation
        .get(PAGE_KEY)
        .and_then(Value::as_i64)
        .and_then(|p| usize::try_from(p).ok())
        .filter(|&p| p < parsed.page_count());

    let Some(page) = page else {
        debug!("Citation page {:?} out of range, leaving as-is", citation.get(PAGE_KEY));
        return Value::Object(citation.clone());
    };

    let lines = citation
        .get(LINES_KEY)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let bboxes: Vec<Value> = lines
        .iter()
        .filter_map(|idx| {
            let bbox = idx
                .as_i64()
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| parsed.line_bbox(page, i));
            if bbox.is_none() {
                debug!("Skipping unresolvable line index {} on page {}", idx, page);
            }
            bbox
        })
        .filter_map(|bbox| serde_json::to_value(bbox).ok())
        .collect();

    let mut enriched: Map<String, Value> = citation
        .iter()
        .filter(|(k, _)| k.as_str() != LINES_KEY)
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    enriched.insert(BBOXES_KEY.into(), Value::Array(bboxes));
    Value::Object(enriched)
}
