//! Schema compiler.
//!
//! Describes the structured result a caller wants ([`RecordDescriptor`]),
//! compiles it into an instance-schema template ([`compile`]) and renders
//! that template for the prompt ([`render`]) or as strict JSON
//! ([`canonicalize`]).
//!
//! The wrapper keys below are shared with [`crate::citation`]: the compiler
//! emits `{value, comment, citations}` leaves and the citation engine
//! recognises and unwraps exactly the `{value, citations}` shape the model
//! echoes back.

mod descriptor;
mod instance;
mod render;

pub use descriptor::{
    DefaultValue, EnumDescriptor, EnumVariant, FieldDescriptor, FieldType, PlaceholderKind,
    RecordDescriptor, ResponseSchema,
};
pub use instance::{compile, CitationTemplate, CitedLeaf, SchemaNode};
pub use render::{canonicalize, render, RENDER_INDENT};

pub const VALUE_KEY: &str = "value";
pub const COMMENT_KEY: &str = "comment";
pub const CITATIONS_KEY: &str = "citations";
pub const PAGE_KEY: &str = "page";
pub const LINES_KEY: &str = "lines";
pub const BBOXES_KEY: &str = "bboxes";
