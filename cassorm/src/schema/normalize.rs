//! Schema normalization.
//!
//! Turns a [`RawSchema`] (what the user wrote) into a [`Schema`]: every
//! property gets a storage column name and a resolved [`TypeHandler`].
//! Properties whose type resolves to nothing are dropped; see
//! [`normalize_strict`] for the fail-fast variant.

use super::types::{FieldInput, FieldOptions, RawSchema};
use crate::error::{OrmError, Result};
use crate::types::{TypeDescriptor, TypeHandler, TypeRegistry};
use heck::ToSnakeCase;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Normalized description of one property.
#[derive(Clone)]
pub struct FieldSpec {
    /// Storage column name.
    pub field: String,
    /// The descriptor as declared.
    pub field_type: TypeDescriptor,
    pub handler: Arc<dyn TypeHandler>,
    /// Type-specific options, carried verbatim.
    pub options: Map<String, Value>,
}

impl FieldSpec {
    pub fn is_counter(&self) -> bool {
        self.handler.is_counter()
    }
}

impl fmt::Debug for FieldSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldSpec")
            .field("field", &self.field)
            .field("type", &self.field_type.to_string())
            .field("handler", &self.handler.name())
            .field("options", &self.options)
            .finish()
    }
}

impl PartialEq for FieldSpec {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
            && self.field_type == other.field_type
            && Arc::ptr_eq(&self.handler, &other.handler)
            && self.options == other.options
    }
}

/// Property name → FieldSpec, in declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: IndexMap<String, FieldSpec>,
}

impl Schema {
    pub fn get(&self, property: &str) -> Option<&FieldSpec> {
        self.fields.get(property)
    }

    pub fn contains(&self, property: &str) -> bool {
        self.fields.contains_key(property)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Reverse lookup from storage column to property.
    pub fn property_for_field(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(_, spec)| spec.field == field)
            .map(|(property, _)| property.as_str())
    }

    /// Express the normalized schema as raw input again, with every storage
    /// name spelled out. Normalizing the result yields an equal schema.
    pub fn to_raw(&self) -> RawSchema {
        self.fields
            .iter()
            .map(|(property, spec)| {
                let options = FieldOptions {
                    field_type: spec.field_type.clone(),
                    field: Some(spec.field.clone()),
                    extra: spec.options.clone(),
                };
                (property.clone(), FieldInput::Options(options))
            })
            .collect()
    }
}

/// Normalize one property. `None` when its type resolves to no handler.
pub fn normalize_property(
    registry: &TypeRegistry,
    property: &str,
    input: &FieldInput,
) -> Option<FieldSpec> {
    let options = input.clone().into_options();
    let handler = registry.resolve(&options.field_type)?;
    let field = match options.field {
        Some(field) if !field.is_empty() => field,
        _ => snake_case(property),
    };

    Some(FieldSpec {
        field,
        field_type: options.field_type,
        handler,
        options: options.extra,
    })
}

/// Normalize a raw schema, silently dropping properties with an unknown
/// type. Each drop is logged at `warn` level.
pub fn normalize(registry: &TypeRegistry, raw: &RawSchema) -> Schema {
    let mut fields = IndexMap::new();
    for (property, input) in raw {
        match normalize_property(registry, property, input) {
            Some(spec) => {
                fields.insert(property.clone(), spec);
            }
            None => {
                log::warn!(
                    "Dropping property '{property}': no type handler for '{}'",
                    descriptor_of(input)
                );
            }
        }
    }
    Schema { fields }
}

/// Like [`normalize`], but an unknown type is an error.
pub fn normalize_strict(registry: &TypeRegistry, raw: &RawSchema) -> Result<Schema> {
    let mut fields = IndexMap::new();
    for (property, input) in raw {
        let spec = normalize_property(registry, property, input).ok_or_else(|| {
            OrmError::UnknownType {
                property: property.clone(),
                descriptor: descriptor_of(input).to_string(),
            }
        })?;
        fields.insert(property.clone(), spec);
    }
    Ok(Schema { fields })
}

/// Snake case with digit runs as words of their own: `page1Views` becomes
/// `page_1_views`, `address2` becomes `address_2`.
pub fn snake_case(name: &str) -> String {
    let snake = name.to_snake_case();
    let mut out = String::with_capacity(snake.len() + 4);
    let mut prev: Option<char> = None;
    for c in snake.chars() {
        if let Some(p) = prev {
            let boundary = (p.is_alphabetic() && c.is_ascii_digit())
                || (p.is_ascii_digit() && c.is_alphabetic());
            if boundary {
                out.push('_');
            }
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

fn descriptor_of(input: &FieldInput) -> &TypeDescriptor {
    match input {
        FieldInput::Bare(descriptor) => descriptor,
        FieldInput::Options(options) => &options.field_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn raw(yaml: &str) -> RawSchema {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_bare_and_options_inputs() {
        let registry = TypeRegistry::with_builtins();
        let schema = normalize(
            &registry,
            &raw("age: int\nfull_name: { type: text, field: name }"),
        );

        let age = schema.get("age").unwrap();
        assert_eq!(age.field, "age");
        assert_eq!(age.field_type, TypeDescriptor::parse("int").unwrap());
        assert!(Arc::ptr_eq(&age.handler, registry.get("int").unwrap()));

        let full_name = schema.get("full_name").unwrap();
        assert_eq!(full_name.field, "name");
        assert_eq!(full_name.field_type, TypeDescriptor::parse("text").unwrap());
        assert!(Arc::ptr_eq(&full_name.handler, registry.get("text").unwrap()));
    }

    #[test]
    fn test_field_defaults_to_snake_case() {
        let registry = TypeRegistry::with_builtins();
        let schema = normalize(
            &registry,
            &raw("firstName: text\nHTTPStatus: int\nalready_snake: int"),
        );
        let fields: Vec<&str> = schema.iter().map(|(_, spec)| spec.field.as_str()).collect();
        assert_eq!(fields, vec!["first_name", "http_status", "already_snake"]);
    }

    #[test]
    fn test_digits_are_separate_words() {
        let registry = TypeRegistry::with_builtins();
        let schema = normalize(
            &registry,
            &raw("address2: text
page1Views: int
ipv4_addr: inet
line_2: text"),
        );
        let fields: Vec<&str> = schema.iter().map(|(_, spec)| spec.field.as_str()).collect();
        assert_eq!(fields, vec!["address_2", "page_1_views", "ipv_4_addr", "line_2"]);
        assert_eq!(snake_case("PageViews2024"), "page_views_2024");
    }

    #[test]
    fn test_malformed_descriptor_is_dropped_or_reported() {
        let registry = TypeRegistry::with_builtins();
        let input = raw("id: uuid
tags: 'list<text'
price: 'decimal(10,2)'");

        let schema = normalize(&registry, &input);
        assert_eq!(schema.properties().collect::<Vec<_>>(), vec!["id"]);

        match normalize_strict(&registry, &input).unwrap_err() {
            OrmError::UnknownType { property, descriptor } => {
                assert_eq!(property, "tags");
                assert_eq!(descriptor, "list<text");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_types_are_dropped_in_order() {
        let registry = TypeRegistry::with_builtins();
        let schema = normalize(
            &registry,
            &raw("a: int\nb: integr\nc: 'list<int>'\nd: { type: 'matrix<int>' }\ne: text"),
        );
        let properties: Vec<&str> = schema.properties().collect();
        assert_eq!(properties, vec!["a", "c", "e"]);
        assert!(!schema.contains("b"));
    }

    #[test]
    fn test_strict_reports_first_unknown() {
        let registry = TypeRegistry::with_builtins();
        let err = normalize_strict(&registry, &raw("a: int\nb: integr\nc: nope")).unwrap_err();
        match err {
            OrmError::UnknownType { property, descriptor } => {
                assert_eq!(property, "b");
                assert_eq!(descriptor, "integr");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(normalize_strict(&registry, &raw("a: int")).is_ok());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let registry = TypeRegistry::with_builtins();
        let input = raw(
            "userId: uuid\nemails: 'set<text>'\nbio: { type: text, max_length: 280 }\nlost: nothing",
        );
        let once = normalize(&registry, &input);
        let twice = normalize(&registry, &once.to_raw());
        assert_eq!(once, twice);
        assert_eq!(normalize(&registry, &input), once);
    }

    #[test]
    fn test_extra_options_carried() {
        let registry = TypeRegistry::with_builtins();
        let schema = normalize(&registry, &raw("bio: { type: text, max_length: 280 }"));
        assert_eq!(schema.get("bio").unwrap().options["max_length"], json!(280));
    }

    #[test]
    fn test_aliases_resolve() {
        let registry = TypeRegistry::with_builtins();
        let schema = normalize(&registry, &raw("n: Int\ns: Text"));
        assert!(Arc::ptr_eq(&schema.get("n").unwrap().handler, registry.get("int").unwrap()));
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_property_for_field() {
        let registry = TypeRegistry::with_builtins();
        let schema = normalize(&registry, &raw("fullName: { type: text, field: name }"));
        assert_eq!(schema.property_for_field("name"), Some("fullName"));
        assert_eq!(schema.property_for_field("full_name"), None);
    }
}
