use super::collection::BUILTIN_COLLECTIONS;
use super::scalar::BUILTIN_SCALARS;
use super::{CollectionType, HandlerKind, ScalarType, TypeDescriptor, TypeHandler};
use heck::ToPascalCase;
use indexmap::IndexMap;
use std::sync::Arc;

/// The set of known field types.
///
/// Built once at startup and shared read-only (`Arc<TypeRegistry>`) by
/// schema normalization and every model schema.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    /// Every handler under its registered name and its PascalCase alias.
    types: IndexMap<String, Arc<dyn TypeHandler>>,
    declaratives: IndexMap<String, Arc<dyn TypeHandler>>,
    /// Scanned in registration order.
    dynamics: IndexMap<String, Arc<dyn TypeHandler>>,
}

impl TypeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in column types.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, kind) in BUILTIN_SCALARS {
            registry.register(name, Arc::new(ScalarType::new(*name, *kind)));
        }
        for (name, kind) in BUILTIN_COLLECTIONS {
            registry.register(name, Arc::new(CollectionType::new(*name, *kind)));
        }
        registry
    }

    /// Register a handler under `name` and under its PascalCase alias
    /// (`big_int` is also reachable as `BigInt`). Re-registering a name
    /// replaces the previous handler: in place when the kind is unchanged,
    /// otherwise it moves to the table of its new kind.
    pub fn register(&mut self, name: &str, handler: Arc<dyn TypeHandler>) {
        let alias = type_alias(name);
        let names: Vec<&str> = if alias == name {
            vec![name]
        } else {
            vec![name, alias.as_str()]
        };

        for key in &names {
            self.types.insert(key.to_string(), handler.clone());
        }

        match handler.kind() {
            HandlerKind::Declarative => {
                for key in &names {
                    self.dynamics.shift_remove(*key);
                    self.declaratives.insert(key.to_string(), handler.clone());
                }
            }
            HandlerKind::Dynamic => {
                for key in &names {
                    self.declaratives.shift_remove(*key);
                }
                self.dynamics.insert(name.to_string(), handler.clone());
            }
        }

        log::debug!("Registered {:?} type '{name}' (alias '{alias}')", handler.kind());
    }

    /// Find the handler for a descriptor. A plain name hits the declarative
    /// table first; anything else goes to the first dynamic handler that
    /// accepts it. `None` is a normal outcome, not an error.
    pub fn resolve(&self, descriptor: &TypeDescriptor) -> Option<Arc<dyn TypeHandler>> {
        if !descriptor.is_parsed() {
            return None;
        }
        if let Some(name) = descriptor.as_name() {
            if let Some(handler) = self.declaratives.get(name) {
                return Some(handler.clone());
            }
        }
        self.dynamics
            .values()
            .find(|handler| handler.is_type_applicable(descriptor))
            .cloned()
    }

    /// Look a handler up by registered name or alias.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn TypeHandler>> {
        self.types.get(name)
    }

    /// All registered names and aliases, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

fn type_alias(name: &str) -> String {
    name.to_pascal_case()
}
