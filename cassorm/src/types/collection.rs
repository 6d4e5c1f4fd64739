use super::{value_kind, HandlerKind, TypeDescriptor, TypeHandler, TypeRegistry};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    List,
    Set,
    Map,
    Tuple,
    Frozen,
}

pub(crate) const BUILTIN_COLLECTIONS: &[(&str, CollectionKind)] = &[
    ("list", CollectionKind::List),
    ("set", CollectionKind::Set),
    ("map", CollectionKind::Map),
    ("tuple", CollectionKind::Tuple),
    ("frozen", CollectionKind::Frozen),
];

/// A dynamic, parameterized column type. Matches `name<...>` (case
/// insensitive) with the right number of type arguments and validates
/// elements through the registry.
#[derive(Debug, Clone)]
pub struct CollectionType {
    name: String,
    kind: CollectionKind,
}

impl CollectionType {
    pub fn new(name: impl Into<String>, kind: CollectionKind) -> Self {
        CollectionType {
            name: name.into(),
            kind,
        }
    }

    fn arity_ok(&self, args: usize) -> bool {
        match self.kind {
            CollectionKind::List | CollectionKind::Set | CollectionKind::Frozen => args == 1,
            CollectionKind::Map => args == 2,
            CollectionKind::Tuple => args >= 1,
        }
    }
}

impl TypeHandler for CollectionType {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> HandlerKind {
        HandlerKind::Dynamic
    }

    fn is_type_applicable(&self, descriptor: &TypeDescriptor) -> bool {
        match descriptor {
            TypeDescriptor::Parameterized { name, args } => {
                name.eq_ignore_ascii_case(&self.name) && self.arity_ok(args.len())
            }
            _ => false,
        }
    }

    fn validate(
        &self,
        registry: &TypeRegistry,
        descriptor: &TypeDescriptor,
        value: &Value,
    ) -> std::result::Result<(), String> {
        match (self.kind, descriptor.args()) {
            (CollectionKind::Frozen, [inner]) => check_element(registry, inner, value),
            (CollectionKind::List, [element]) => {
                let items = expect_array(value, "list")?;
                for (i, item) in items.iter().enumerate() {
                    check_element(registry, element, item).map_err(|e| format!("element {i}: {e}"))?;
                }
                Ok(())
            }
            (CollectionKind::Set, [element]) => {
                let items = expect_array(value, "set")?;
                for (i, item) in items.iter().enumerate() {
                    check_element(registry, element, item).map_err(|e| format!("element {i}: {e}"))?;
                    if items[..i].contains(item) {
                        return Err(format!("element {i}: duplicate value {item}"));
                    }
                }
                Ok(())
            }
            (CollectionKind::Tuple, args) if !args.is_empty() => {
                let items = expect_array(value, "tuple")?;
                if items.len() != args.len() {
                    return Err(format!(
                        "expected tuple of {} values, got {}",
                        args.len(),
                        items.len()
                    ));
                }
                for (i, (item, arg)) in items.iter().zip(args).enumerate() {
                    check_element(registry, arg, item).map_err(|e| format!("position {i}: {e}"))?;
                }
                Ok(())
            }
            (CollectionKind::Map, [key_type, item_type]) => {
                let entries = value
                    .as_object()
                    .ok_or_else(|| format!("expected map, got {}", value_kind(value)))?;
                for (key, item) in entries {
                    if !map_key_candidates(key)
                        .iter()
                        .any(|k| check_element(registry, key_type, k).is_ok())
                    {
                        return Err(format!("key '{key}': expected {key_type}"));
                    }
                    check_element(registry, item_type, item).map_err(|e| format!("key '{key}': {e}"))?;
                }
                Ok(())
            }
            (_, args) => Err(format!(
                "'{descriptor}' is not a {} type: got {} type argument(s)",
                self.name,
                args.len()
            )),
        }
    }

    fn to_cql(&self, registry: &TypeRegistry, descriptor: &TypeDescriptor, value: &Value) -> Value {
        match (self.kind, descriptor.args(), value) {
            (CollectionKind::Frozen, [inner], _) => element_to_cql(registry, inner, value),
            (CollectionKind::List | CollectionKind::Set, [element], Value::Array(items)) => Value::Array(
                items
                    .iter()
                    .map(|item| element_to_cql(registry, element, item))
                    .collect(),
            ),
            (CollectionKind::Tuple, args, Value::Array(items)) if !args.is_empty() => Value::Array(
                items
                    .iter()
                    .zip(args)
                    .map(|(item, arg)| element_to_cql(registry, arg, item))
                    .collect(),
            ),
            (CollectionKind::Map, [_, item_type], Value::Object(entries)) => {
                let mut out = Map::new();
                for (key, item) in entries {
                    out.insert(key.clone(), element_to_cql(registry, item_type, item));
                }
                Value::Object(out)
            }
            _ => value.clone(),
        }
    }
}

fn expect_array<'v>(value: &'v Value, label: &str) -> std::result::Result<&'v Vec<Value>, String> {
    value
        .as_array()
        .ok_or_else(|| format!("expected {label}, got {}", value_kind(value)))
}

fn element_handler(
    registry: &TypeRegistry,
    descriptor: &TypeDescriptor,
) -> std::result::Result<Arc<dyn TypeHandler>, String> {
    registry
        .resolve(descriptor)
        .ok_or_else(|| format!("unknown element type '{descriptor}'"))
}

fn check_element(
    registry: &TypeRegistry,
    descriptor: &TypeDescriptor,
    value: &Value,
) -> std::result::Result<(), String> {
    if value.is_null() {
        return Err("null elements are not allowed".to_string());
    }
    element_handler(registry, descriptor)?.validate(registry, descriptor, value)
}

fn element_to_cql(registry: &TypeRegistry, descriptor: &TypeDescriptor, value: &Value) -> Value {
    match registry.resolve(descriptor) {
        Some(handler) if !value.is_null() => handler.to_cql(registry, descriptor, value),
        _ => value.clone(),
    }
}

/// JSON object keys are always strings; a `map<int, ...>` key arrives as
/// `"42"`, so try it both verbatim and parsed.
fn map_key_candidates(key: &str) -> Vec<Value> {
    let mut candidates = vec![Value::String(key.to_string())];
    if let Ok(parsed) = serde_json::from_str::<Value>(key) {
        if !parsed.is_string() {
            candidates.push(parsed);
        }
    }
    candidates
}
