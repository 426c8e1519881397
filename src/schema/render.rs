//! Text forms of a compiled instance schema.
//!
//! [`render`] produces the prompt template: JSON-shaped, but placeholder
//! tokens are left unquoted and leaf comments ride along as `# …` trailers.
//! [`canonicalize`] produces strict JSON without comments.

use super::instance::{CitationTemplate, CitedLeaf, SchemaNode};
use super::{CITATIONS_KEY, LINES_KEY, PAGE_KEY, VALUE_KEY};
use crate::document::CitationLevel;

/// Spaces per nesting level in [`render`] output.
pub const RENDER_INDENT: usize = 4;

/// Render a schema node as the template text embedded in the prompt.
pub fn render(node: &SchemaNode) -> String {
    render_value(node, 0)
}

/// Strict JSON form with every `comment` removed, two-space indented.
pub fn canonicalize(node: &SchemaNode) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&node.to_value_with(false))
}

/// Render `node` as a value whose owning line is indented by `indent` spaces.
///
/// The first line is not indented (it follows a key or opening bracket);
/// continuation lines carry absolute indentation.
fn render_value(node: &SchemaNode, indent: usize) -> String {
    match node {
        SchemaNode::Placeholder(kind) => kind.token(),
        SchemaNode::List(inner) => match inner.as_ref() {
            SchemaNode::Placeholder(kind) => format!("[{}]", kind.token()),
            other => {
                let inner_indent = indent + RENDER_INDENT;
                format!(
                    "[\n{}{}\n{}]",
                    pad(inner_indent),
                    render_value(other, inner_indent),
                    pad(indent)
                )
            }
        },
        SchemaNode::Cited(leaf) => render_cited(leaf, indent),
        SchemaNode::Record(entries) if entries.is_empty() => "{}".to_string(),
        SchemaNode::Record(entries) => {
            let member_indent = indent + RENDER_INDENT;
            let mut lines = vec!["{".to_string()];
            for (i, (key, child)) in entries.iter().enumerate() {
                let comma = if i + 1 < entries.len() { "," } else { "" };
                lines.push(format!(
                    "{}{}: {}{}",
                    pad(member_indent),
                    quote_key(key),
                    render_value(child, member_indent),
                    comma
                ));
            }
            lines.push(format!("{}}}", pad(indent)));
            lines.join("\n")
        }
    }
}

fn render_cited(leaf: &CitedLeaf, indent: usize) -> String {
    let member_indent = pad(indent + RENDER_INDENT);
    let comment = if leaf.comment.is_empty() {
        String::new()
    } else {
        format!("  # {}", single_line(&leaf.comment))
    };

    [
        "{".to_string(),
        format!(
            "{}\"{}\": {},{}",
            member_indent,
            VALUE_KEY,
            leaf.value.token(),
            comment
        ),
        format!(
            "{}\"{}\": {}",
            member_indent,
            CITATIONS_KEY,
            render_citations(&leaf.citations)
        ),
        format!("{}}}", pad(indent)),
    ]
    .join("\n")
}

/// Inline citation list, e.g. `[{"page": <integer>, "lines": [<integer>]}]`.
fn render_citations(citations: &[CitationTemplate]) -> String {
    let items: Vec<String> = citations
        .iter()
        .map(|c| match c.level {
            CitationLevel::Line => format!(
                "{{\"{}\": <integer>, \"{}\": [<integer>]}}",
                PAGE_KEY, LINES_KEY
            ),
            CitationLevel::Page => format!("{{\"{}\": <integer>}}", PAGE_KEY),
        })
        .collect();
    format!("[{}]", items.join(", "))
}

fn quote_key(key: &str) -> String {
    serde_json::to_string(key).unwrap_or_else(|_| format!("\"{}\"", key))
}

/// Comments are trailers on one line; embedded newlines would break the layout.
fn single_line(s: &str) -> String {
    s.lines()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn pad(width: usize) -> String {
    " ".repeat(width)
}
