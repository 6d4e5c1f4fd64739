//! Model instances and the statements that persist them.
//!
//! A [`Model`] holds one row's worth of values bound to a shared
//! [`ModelSchema`]. It tracks the row it was loaded from, so that
//! [`Model::save_statements`] can emit only what changed: an `INSERT` for new
//! rows, an `UPDATE` of changed columns for loaded ones, and `c = c + ?`
//! increments for counter tables.
//!
//! Changing the primary key of a loaded row deletes the old row before
//! writing the new one. For counter tables the storage engine only hides a
//! deleted counter: if the old key is written again later, the counter
//! resumes from its last value instead of zero. That is a property of the
//! engine and is not compensated for here.

mod definition;

pub use definition::ModelSchema;

use crate::client::Statement;
use crate::error::{OrmError, Result};
use crate::schema::FieldSpec;
use crate::validation::{self, ValidationError};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Anything the batch coordinator can persist.
#[async_trait]
pub trait Saveable: Send + Sync {
    /// Check the current values. Called before any statement is generated.
    async fn validate(&self) -> std::result::Result<(), ValidationError>;

    /// Counter statements go to a separate batch.
    fn is_counter(&self) -> bool;

    /// Statements that make storage reflect the current values. Pure; assumes
    /// `validate` succeeded.
    fn save_statements(&self) -> Vec<Statement>;
}

#[async_trait]
impl<T: Saveable + ?Sized> Saveable for &T {
    async fn validate(&self) -> std::result::Result<(), ValidationError> {
        (**self).validate().await
    }

    fn is_counter(&self) -> bool {
        (**self).is_counter()
    }

    fn save_statements(&self) -> Vec<Statement> {
        (**self).save_statements()
    }
}

#[async_trait]
impl<T: Saveable + ?Sized> Saveable for Arc<T> {
    async fn validate(&self) -> std::result::Result<(), ValidationError> {
        (**self).validate().await
    }

    fn is_counter(&self) -> bool {
        (**self).is_counter()
    }

    fn save_statements(&self) -> Vec<Statement> {
        (**self).save_statements()
    }
}

/// One row bound to a model schema.
#[derive(Debug, Clone)]
pub struct Model {
    schema: Arc<ModelSchema>,
    values: IndexMap<String, Value>,
    /// Values as last read from (or written to) storage, by property.
    loaded: Option<IndexMap<String, Value>>,
}

impl Model {
    /// A new, unsaved row.
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        Model {
            schema,
            values: IndexMap::new(),
            loaded: None,
        }
    }

    /// A row read from storage. `row` is keyed by column name; columns the
    /// schema doesn't know are ignored.
    pub fn from_row(schema: Arc<ModelSchema>, row: &Map<String, Value>) -> Self {
        let mut values = IndexMap::new();
        for (property, spec) in schema.fields().iter() {
            if let Some(value) = row.get(&spec.field) {
                values.insert(property.to_string(), value.clone());
            }
        }
        Model {
            schema,
            loaded: Some(values.clone()),
            values,
        }
    }

    pub fn schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn is_counter(&self) -> bool {
        self.schema.is_counter()
    }

    pub fn is_new(&self) -> bool {
        self.loaded.is_none()
    }

    pub fn get(&self, property: &str) -> Option<&Value> {
        self.values.get(property)
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    /// Set a property. The value is checked against the field type on
    /// validation, not here.
    pub fn set(&mut self, property: &str, value: impl Into<Value>) -> Result<()> {
        self.check_property(property)?;
        self.values.insert(property.to_string(), value.into());
        Ok(())
    }

    /// Builder form of [`Model::set`].
    pub fn with(mut self, property: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(property, value)?;
        Ok(self)
    }

    /// Add `by` to a counter field. A missing value counts as zero.
    pub fn increment(&mut self, property: &str, by: i64) -> Result<()> {
        self.check_property(property)?;
        let is_counter = self
            .schema
            .fields()
            .get(property)
            .map_or(false, |spec| spec.is_counter());
        if !is_counter {
            return Err(OrmError::InvalidValue {
                property: property.to_string(),
                message: "only counter fields can be incremented".into(),
            });
        }

        let current = match self.values.get(property) {
            None | Some(Value::Null) => 0,
            Some(value) => value.as_i64().ok_or_else(|| OrmError::InvalidValue {
                property: property.to_string(),
                message: format!("current value {value} is not an integer"),
            })?,
        };
        let next = current.checked_add(by).ok_or_else(|| OrmError::InvalidValue {
            property: property.to_string(),
            message: "counter overflow".into(),
        })?;
        self.values.insert(property.to_string(), Value::from(next));
        Ok(())
    }

    /// Primary key values in key order; missing values are `Null`.
    pub fn primary_key(&self) -> Vec<(&str, Value)> {
        self.schema
            .primary_key()
            .iter()
            .map(|key| {
                let value = self.values.get(key).cloned().unwrap_or(Value::Null);
                (key.as_str(), value)
            })
            .collect()
    }

    /// Whether the primary key differs from the loaded row's.
    pub fn key_changed(&self) -> bool {
        match &self.loaded {
            Some(loaded) => self
                .schema
                .primary_key()
                .iter()
                .any(|key| loaded.get(key) != self.values.get(key)),
            None => false,
        }
    }

    /// Synchronous validation against the schema. For counter rows this also
    /// rejects changes too large to send as a single 64-bit increment.
    pub fn check(&self) -> std::result::Result<(), ValidationError> {
        let mut result = validation::validate_values(&self.schema, &self.values);
        if self.schema.is_counter() {
            for (property, _, delta) in self.counter_deltas(self.key_changed()) {
                if delta.is_none() {
                    result.add_issue(property, "counter change overflows a 64-bit increment");
                }
            }
        }
        result.into_result(self.schema.name())
    }

    /// Adopt the current values as the stored state, after a successful save.
    pub fn mark_saved(&mut self) {
        self.loaded = Some(self.values.clone());
    }

    /// The statements needed to persist the current values.
    pub fn save_statements(&self) -> Vec<Statement> {
        let mut statements = Vec::new();

        let key_changed = self.key_changed();
        if key_changed {
            if let Some(loaded) = &self.loaded {
                statements.push(self.delete_statement(loaded));
            }
        }

        let statement = if self.schema.is_counter() {
            self.counter_statement(key_changed)
        } else if self.loaded.is_none() || key_changed {
            Some(self.insert_statement())
        } else {
            self.update_statement()
        };
        statements.extend(statement);

        statements
    }

    fn check_property(&self, property: &str) -> Result<()> {
        if self.schema.fields().contains(property) {
            Ok(())
        } else {
            Err(OrmError::UnknownProperty {
                model: self.schema.name().to_string(),
                property: property.to_string(),
            })
        }
    }

    fn column<'a>(&'a self, property: &'a str) -> &'a str {
        self.schema
            .fields()
            .get(property)
            .map(|spec| spec.field.as_str())
            .unwrap_or(property)
    }

    fn param(&self, property: &str, value: &Value) -> Value {
        match self.schema.fields().get(property) {
            Some(spec) if !value.is_null() => {
                spec.handler
                    .to_cql(self.schema.registry(), &spec.field_type, value)
            }
            _ => value.clone(),
        }
    }

    /// `k1 = ? AND k2 = ?` plus its parameters, taken from `source`.
    fn where_clause(&self, source: &IndexMap<String, Value>) -> (String, Vec<Value>) {
        let mut clauses = Vec::new();
        let mut params = Vec::new();
        for key in self.schema.primary_key() {
            clauses.push(format!("{} = ?", self.column(key)));
            let value = source.get(key).cloned().unwrap_or(Value::Null);
            params.push(self.param(key, &value));
        }
        (clauses.join(" AND "), params)
    }

    fn delete_statement(&self, loaded: &IndexMap<String, Value>) -> Statement {
        let (clause, params) = self.where_clause(loaded);
        Statement::new(
            format!("DELETE FROM {} WHERE {clause}", self.schema.qualified_table()),
            params,
        )
    }

    fn insert_statement(&self) -> Statement {
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (property, spec) in self.schema.fields().iter() {
            if let Some(value) = self.values.get(property) {
                columns.push(spec.field.as_str());
                params.push(self.param(property, value));
            }
        }
        let placeholders = vec!["?"; columns.len()].join(", ");
        Statement::new(
            format!(
                "INSERT INTO {} ({}) VALUES ({placeholders})",
                self.schema.qualified_table(),
                columns.join(", ")
            ),
            params,
        )
    }

    fn update_statement(&self) -> Option<Statement> {
        let loaded = self.loaded.as_ref()?;
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (property, spec) in self.schema.fields().iter() {
            if self.schema.is_key(property) {
                continue;
            }
            let Some(value) = self.values.get(property) else {
                continue;
            };
            if loaded.get(property) == Some(value) {
                continue;
            }
            assignments.push(format!("{} = ?", spec.field));
            params.push(self.param(property, value));
        }
        if assignments.is_empty() {
            return None;
        }

        let (clause, key_params) = self.where_clause(&self.values);
        params.extend(key_params);
        Some(Statement::new(
            format!(
                "UPDATE {} SET {} WHERE {clause}",
                self.schema.qualified_table(),
                assignments.join(", ")
            ),
            params,
        ))
    }

    /// The amount to add to each counter field: the change since the loaded
    /// row, or the whole value for a new row or a moved key. `None` when the
    /// change doesn't fit in an `i64`.
    fn counter_deltas(&self, key_changed: bool) -> Vec<(&str, &FieldSpec, Option<i64>)> {
        let baseline = if key_changed { None } else { self.loaded.as_ref() };
        self.schema
            .fields()
            .iter()
            .filter(|(property, _)| !self.schema.is_key(property))
            .map(|(property, spec)| {
                let current = self.values.get(property).and_then(Value::as_i64).unwrap_or(0);
                let before = baseline
                    .and_then(|loaded| loaded.get(property))
                    .and_then(Value::as_i64)
                    .unwrap_or(0);
                (property, spec, current.checked_sub(before))
            })
            .collect()
    }

    fn counter_statement(&self, key_changed: bool) -> Option<Statement> {
        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for (_, spec, delta) in self.counter_deltas(key_changed) {
            // Overflow is reported by check(), which runs first.
            let Some(delta) = delta else {
                continue;
            };
            if delta == 0 {
                continue;
            }
            assignments.push(format!("{0} = {0} + ?", spec.field));
            params.push(Value::from(delta));
        }
        if assignments.is_empty() {
            return None;
        }

        let (clause, key_params) = self.where_clause(&self.values);
        params.extend(key_params);
        Some(Statement::new(
            format!(
                "UPDATE {} SET {} WHERE {clause}",
                self.schema.qualified_table(),
                assignments.join(", ")
            ),
            params,
        ))
    }
}

#[async_trait]
impl Saveable for Model {
    async fn validate(&self) -> std::result::Result<(), ValidationError> {
        self.check()
    }

    fn is_counter(&self) -> bool {
        Model::is_counter(self)
    }

    fn save_statements(&self) -> Vec<Statement> {
        Model::save_statements(self)
    }
}
