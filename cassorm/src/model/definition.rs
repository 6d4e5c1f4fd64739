use crate::error::{OrmError, Result};
use crate::schema::{normalize, snake_case, ModelDefinition, Schema};
use crate::types::TypeRegistry;
use std::sync::Arc;

/// A checked, normalized model definition. Shared read-only by all
/// instances of the model.
#[derive(Debug)]
pub struct ModelSchema {
    name: String,
    table: String,
    keyspace: Option<String>,
    primary_key: Vec<String>,
    counter: bool,
    fields: Schema,
    registry: Arc<TypeRegistry>,
}

impl ModelSchema {
    /// Normalize `definition` against `registry` and check that it describes
    /// a table the storage engine accepts:
    /// - the primary key is non-empty and names known properties;
    /// - key properties are not counters;
    /// - a counter model has at least one non-key column, all counters;
    /// - a regular model has no counter columns.
    pub fn new(name: &str, definition: &ModelDefinition, registry: Arc<TypeRegistry>) -> Result<Self> {
        let fields = normalize(&registry, &definition.fields);

        if definition.key.is_empty() {
            return Err(OrmError::Schema(format!("Model '{name}' has no primary key")));
        }
        for key in &definition.key {
            let spec = fields.get(key).ok_or_else(|| {
                OrmError::Schema(format!(
                    "Model '{name}': primary key property '{key}' is not a known field"
                ))
            })?;
            if spec.is_counter() {
                return Err(OrmError::Schema(format!(
                    "Model '{name}': primary key property '{key}' cannot be a counter"
                )));
            }
        }

        let mut value_columns = 0;
        for (property, spec) in fields.iter() {
            if definition.key.iter().any(|k| k == property) {
                continue;
            }
            value_columns += 1;
            if definition.counter && !spec.is_counter() {
                return Err(OrmError::Schema(format!(
                    "Counter model '{name}': field '{property}' must be a counter"
                )));
            }
            if !definition.counter && spec.is_counter() {
                return Err(OrmError::Schema(format!(
                    "Model '{name}': counter field '{property}' requires `counter: true`"
                )));
            }
        }
        if definition.counter && value_columns == 0 {
            return Err(OrmError::Schema(format!(
                "Counter model '{name}' has no counter fields"
            )));
        }

        let table = definition
            .table
            .clone()
            .unwrap_or_else(|| snake_case(name));

        Ok(ModelSchema {
            name: name.to_string(),
            table,
            keyspace: definition.keyspace.clone(),
            primary_key: definition.key.clone(),
            counter: definition.counter,
            fields,
            registry,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref()
    }

    /// `keyspace.table`, or just `table` without a keyspace.
    pub fn qualified_table(&self) -> String {
        match &self.keyspace {
            Some(keyspace) => format!("{keyspace}.{}", self.table),
            None => self.table.clone(),
        }
    }

    /// Primary key properties, partition key first.
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    pub fn is_key(&self, property: &str) -> bool {
        self.primary_key.iter().any(|k| k == property)
    }

    pub fn is_counter(&self) -> bool {
        self.counter
    }

    pub fn fields(&self) -> &Schema {
        &self.fields
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }
}
