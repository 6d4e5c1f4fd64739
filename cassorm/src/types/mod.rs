//! Field types.
//!
//! Every column type a schema can mention is backed by a [`TypeHandler`].
//! Handlers come in two flavours: declarative ones are picked by exact name
//! (`text`, `int`), dynamic ones by a predicate over the parsed
//! [`TypeDescriptor`] (`list<int>`, `map<text, int>`). The [`TypeRegistry`]
//! owns them and performs the lookup.

mod collection;
mod descriptor;
mod registry;
mod scalar;

pub use collection::{CollectionKind, CollectionType};
pub use descriptor::TypeDescriptor;
pub use registry::TypeRegistry;
pub use scalar::{ScalarKind, ScalarType};

use serde_json::Value;
use std::fmt;

/// How a handler is matched against a schema's type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Declarative,
    Dynamic,
}

/// A pluggable field type.
pub trait TypeHandler: Send + Sync + fmt::Debug {
    /// The name the handler is registered under.
    fn name(&self) -> &str;

    fn kind(&self) -> HandlerKind {
        HandlerKind::Declarative
    }

    /// Dynamic matcher. Only consulted when `kind()` is `Dynamic`.
    fn is_type_applicable(&self, _descriptor: &TypeDescriptor) -> bool {
        false
    }

    /// Whether columns of this type are increment-only counters.
    fn is_counter(&self) -> bool {
        false
    }

    /// Check a non-null value. The error is a human readable reason.
    fn validate(
        &self,
        registry: &TypeRegistry,
        descriptor: &TypeDescriptor,
        value: &Value,
    ) -> std::result::Result<(), String>;

    /// Convert a validated value into a statement parameter.
    fn to_cql(&self, _registry: &TypeRegistry, _descriptor: &TypeDescriptor, value: &Value) -> Value {
        value.clone()
    }
}

/// Short label for a JSON value, used in validation messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
