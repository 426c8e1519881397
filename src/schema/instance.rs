//! Instance-schema compilation.
//!
//! Turns a [`RecordDescriptor`] into a [`SchemaNode`] tree: a template of the
//! JSON the model should return, with placeholder holes at the leaves and,
//! when citations are enabled, a `{value, comment, citations}` wrapper around
//! every leaf.

use serde_json::{Map, Value};

use super::descriptor::{FieldDescriptor, PlaceholderKind, RecordDescriptor};
use super::{CITATIONS_KEY, COMMENT_KEY, LINES_KEY, PAGE_KEY, VALUE_KEY};
use crate::document::CitationLevel;

/// Template for one citation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CitationTemplate {
    pub level: CitationLevel,
}

impl CitationTemplate {
    pub fn new(level: CitationLevel) -> Self {
        Self { level }
    }

    pub fn includes_lines(&self) -> bool {
        self.level == CitationLevel::Line
    }

    pub fn to_value(&self) -> Value {
        let mut item = Map::new();
        item.insert(PAGE_KEY.into(), Value::String(PlaceholderKind::Integer.token()));
        if self.includes_lines() {
            item.insert(
                LINES_KEY.into(),
                Value::Array(vec![Value::String(PlaceholderKind::Integer.token())]),
            );
        }
        Value::Object(item)
    }
}

/// Leaf wrapped with its annotation and citation template.
#[derive(Debug, Clone, PartialEq)]
pub struct CitedLeaf {
    pub value: PlaceholderKind,
    pub comment: String,
    pub citations: Vec<CitationTemplate>,
}

/// One node of a compiled instance schema.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    /// Bare hole, e.g. `<string>`.
    Placeholder(PlaceholderKind),
    /// Hole with comment and citation template.
    Cited(CitedLeaf),
    /// Fields in declared order.
    Record(Vec<(String, SchemaNode)>),
    /// One-element template standing for any number of items.
    List(Box<SchemaNode>),
}

impl SchemaNode {
    /// Child of a record node by field name.
    pub fn get(&self, key: &str) -> Option<&SchemaNode> {
        match self {
            SchemaNode::Record(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Template element of a list node.
    pub fn item(&self) -> Option<&SchemaNode> {
        match self {
            SchemaNode::List(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn keys(&self) -> Vec<&str> {
        match self {
            SchemaNode::Record(entries) => entries.iter().map(|(k, _)| k.as_str()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_cited(&self) -> Option<&CitedLeaf> {
        match self {
            SchemaNode::Cited(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Full JSON-like form, placeholders as strings, comments included.
    pub fn to_value(&self) -> Value {
        self.to_value_with(true)
    }

    pub(crate) fn to_value_with(&self, include_comments: bool) -> Value {
        match self {
            SchemaNode::Placeholder(kind) => Value::String(kind.token()),
            SchemaNode::Cited(leaf) => {
                let mut obj = Map::new();
                obj.insert(VALUE_KEY.into(), Value::String(leaf.value.token()));
                if include_comments {
                    obj.insert(COMMENT_KEY.into(), Value::String(leaf.comment.clone()));
                }
                obj.insert(
                    CITATIONS_KEY.into(),
                    Value::Array(leaf.citations.iter().map(|c| c.to_value()).collect()),
                );
                Value::Object(obj)
            }
            SchemaNode::Record(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_value_with(include_comments)))
                    .collect(),
            ),
            SchemaNode::List(inner) => Value::Array(vec![inner.to_value_with(include_comments)]),
        }
    }
}

/// Compile a record descriptor into its instance schema.
///
/// Total over well-formed descriptors: unknown leaf types become `<string>`.
/// `level` is ignored when `citation` is false.
pub fn compile(record: &RecordDescriptor, level: CitationLevel, citation: bool) -> SchemaNode {
    let entries = record
        .fields
        .iter()
        .map(|field| (field.name.clone(), compile_field(field, level, citation)))
        .collect();
    SchemaNode::Record(entries)
}

fn compile_field(field: &FieldDescriptor, level: CitationLevel, citation: bool) -> SchemaNode {
    let node = match field.field_type.nested_record() {
        Some(nested) => compile(nested, level, citation),
        None => {
            let kind = field.field_type.placeholder_kind();
            if citation {
                SchemaNode::Cited(CitedLeaf {
                    value: kind,
                    comment: field.comment(),
                    citations: vec![CitationTemplate::new(level)],
                })
            } else {
                SchemaNode::Placeholder(kind)
            }
        }
    };

    if field.field_type.is_list() {
        SchemaNode::List(Box::new(node))
    } else {
        node
    }
}
