//! Descriptions of the structured result the model is asked to produce.
//!
//! A [`RecordDescriptor`] is an ordered list of named fields; field types form
//! a closed set that may nest records inside lists and optionals to any
//! depth. Descriptors can be built in code or deserialized:
//!
//! ```
//! use doc_intel::schema::{FieldDescriptor, FieldType, RecordDescriptor};
//!
//! let address = RecordDescriptor::new()
//!     .field(FieldDescriptor::new("street", FieldType::String).description("street name"))
//!     .field(FieldDescriptor::new("city", FieldType::String));
//! let person = RecordDescriptor::new()
//!     .field(FieldDescriptor::new("name", FieldType::String))
//!     .field(FieldDescriptor::new("address", FieldType::Record(address)));
//! assert_eq!(person.len(), 2);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Placeholder kinds a leaf can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaceholderKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
}

impl PlaceholderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceholderKind::String => "string",
            PlaceholderKind::Integer => "integer",
            PlaceholderKind::Number => "number",
            PlaceholderKind::Boolean => "boolean",
            PlaceholderKind::Object => "object",
        }
    }

    /// The unquoted hole token, e.g. `<integer>`.
    pub fn token(&self) -> String {
        format!("<{}>", self.as_str())
    }
}

impl std::fmt::Display for PlaceholderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<{}>", self.as_str())
    }
}

/// A named enumeration whose members carry an underlying value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDescriptor {
    pub name: String,
    pub variants: Vec<EnumVariant>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumVariant {
    /// Symbolic name, e.g. `RED`.
    pub name: String,
    /// Underlying value, e.g. `"red"`.
    pub value: Value,
}

impl EnumDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variants: Vec::new(),
        }
    }

    pub fn variant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variants.push(EnumVariant {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Underlying value of the member called `name`.
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.variants
            .iter()
            .find(|v| v.name == name)
            .map(|v| &v.value)
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Enum(EnumDescriptor),
    DateTime,
    Date,
    /// Free-form mapping.
    Map,
    Record(RecordDescriptor),
    List(Box<FieldType>),
    Optional(Box<FieldType>),
    /// A type this crate has no placeholder for; rendered as `<string>`.
    Other(String),
}

impl FieldType {
    pub fn list(inner: FieldType) -> Self {
        FieldType::List(Box::new(inner))
    }

    pub fn optional(inner: FieldType) -> Self {
        FieldType::Optional(Box::new(inner))
    }

    /// Resolve the leaf placeholder, descending through list/optional wrappers.
    pub fn placeholder_kind(&self) -> PlaceholderKind {
        match self {
            FieldType::String => PlaceholderKind::String,
            FieldType::Integer => PlaceholderKind::Integer,
            FieldType::Number => PlaceholderKind::Number,
            FieldType::Boolean => PlaceholderKind::Boolean,
            FieldType::Enum(_) | FieldType::DateTime | FieldType::Date => PlaceholderKind::String,
            FieldType::Map => PlaceholderKind::Object,
            FieldType::List(inner) | FieldType::Optional(inner) => inner.placeholder_kind(),
            FieldType::Record(_) | FieldType::Other(_) => PlaceholderKind::String,
        }
    }

    /// The record this type wraps, if any, after unwrapping lists and optionals.
    pub fn nested_record(&self) -> Option<&RecordDescriptor> {
        match self {
            FieldType::Record(record) => Some(record),
            FieldType::List(inner) | FieldType::Optional(inner) => inner.nested_record(),
            _ => None,
        }
    }

    /// Whether the type is a list once optional wrappers are removed.
    pub fn is_list(&self) -> bool {
        match self {
            FieldType::List(_) => true,
            FieldType::Optional(inner) => inner.is_list(),
            _ => false,
        }
    }

    /// The enum this type wraps, if any, after unwrapping lists and optionals.
    pub fn enum_descriptor(&self) -> Option<&EnumDescriptor> {
        match self {
            FieldType::Enum(e) => Some(e),
            FieldType::List(inner) | FieldType::Optional(inner) => inner.enum_descriptor(),
            _ => None,
        }
    }
}

/// Default value of a field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DefaultValue {
    #[default]
    None,
    Literal(Value),
    /// Symbolic enum member name, resolved through the field's enum type.
    EnumVariant(String),
    /// Produced at use time by a factory; shown to the model as `[]`.
    EmptyCollection,
}

impl DefaultValue {
    fn is_none(&self) -> bool {
        matches!(self, DefaultValue::None | DefaultValue::Literal(Value::Null))
    }
}

/// One named field of a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<Value>,
    #[serde(default, skip_serializing_if = "DefaultValue::is_none")]
    pub default: DefaultValue,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            description: None,
            examples: Vec::new(),
            default: DefaultValue::None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn examples<I, V>(mut self, examples: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.examples = examples.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_value(mut self, default: impl Into<Value>) -> Self {
        self.default = DefaultValue::Literal(default.into());
        self
    }

    pub fn default_variant(mut self, variant: impl Into<String>) -> Self {
        self.default = DefaultValue::EnumVariant(variant.into());
        self
    }

    pub fn default_factory(mut self) -> Self {
        self.default = DefaultValue::EmptyCollection;
        self
    }

    /// The annotation shown next to the field's placeholder.
    ///
    /// Joins `desc: …`, `examples: …` and `default: …` with ` | `, skipping
    /// absent parts; empty when nothing is known about the field.
    pub fn comment(&self) -> String {
        let mut parts = Vec::new();

        if let Some(desc) = self.description.as_deref().filter(|d| !d.is_empty()) {
            parts.push(format!("desc: {}", desc));
        }
        if !self.examples.is_empty() {
            let examples = Value::Array(self.examples.clone());
            parts.push(format!("examples: {}", examples));
        }
        if let Some(default) = self.rendered_default() {
            parts.push(format!("default: {}", default));
        }

        parts.join(" | ")
    }

    fn rendered_default(&self) -> Option<String> {
        match &self.default {
            DefaultValue::None | DefaultValue::Literal(Value::Null) => None,
            DefaultValue::Literal(value) => Some(render_scalar(value)),
            DefaultValue::EmptyCollection => Some("[]".to_string()),
            DefaultValue::EnumVariant(name) => Some(
                self.field_type
                    .enum_descriptor()
                    .and_then(|e| e.value_of(name))
                    .map(render_scalar)
                    .unwrap_or_else(|| name.clone()),
            ),
        }
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered collection of uniquely named fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordDescriptor {
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field, replacing any earlier field with the same name in place.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}

/// Types that describe their own extraction schema.
///
/// Implement this for the struct a caller wants back from
/// [`crate::processor::DocumentProcessor::extract_as`].
pub trait ResponseSchema {
    fn record_descriptor() -> RecordDescriptor;
}
