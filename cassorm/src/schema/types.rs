use crate::error::{OrmError, Result};
use crate::model::ModelSchema;
use crate::types::{TypeDescriptor, TypeRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Property name → raw field declaration, in declaration order.
pub type RawSchema = IndexMap<String, FieldInput>;

/// Top-level schema document, usually parsed from YAML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Default keyspace for every model that doesn't name its own.
    #[serde(default)]
    pub keyspace: Option<String>,
    #[serde(default)]
    pub models: IndexMap<String, ModelDefinition>,
}

impl SchemaDefinition {
    /// Normalize and check every model against `registry`.
    pub fn build(&self, registry: &Arc<TypeRegistry>) -> Result<IndexMap<String, Arc<ModelSchema>>> {
        let mut models = IndexMap::new();
        for (name, definition) in &self.models {
            let mut definition = definition.clone();
            if definition.keyspace.is_none() {
                definition.keyspace = self.keyspace.clone();
            }
            let schema = ModelSchema::new(name, &definition, registry.clone())?;
            models.insert(name.clone(), Arc::new(schema));
        }
        Ok(models)
    }
}

/// Definition of a single model (one table).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelDefinition {
    /// Table name; defaults to the snake-cased model name.
    #[serde(default)]
    pub table: Option<String>,
    #[serde(default)]
    pub keyspace: Option<String>,
    /// Counter table: every non-key column is a `counter`.
    #[serde(default)]
    pub counter: bool,
    /// Primary key properties, partition key first.
    #[serde(default)]
    pub key: Vec<String>,
    #[serde(default)]
    pub fields: RawSchema,
}

impl ModelDefinition {
    pub fn new<I, S>(key: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ModelDefinition {
            key: key.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn counter(mut self, counter: bool) -> Self {
        self.counter = counter;
        self
    }

    pub fn field(mut self, property: impl Into<String>, input: FieldInput) -> Self {
        self.fields.insert(property.into(), input);
        self
    }
}

/// A raw field declaration: either a bare type descriptor or an options
/// object carrying `type`, an optional storage `field` name and any
/// type-specific extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldInput {
    Bare(TypeDescriptor),
    Options(FieldOptions),
}

impl FieldInput {
    /// A bare descriptor such as `"list<int>"`. Malformed text is kept
    /// unparsed and later dropped by normalization.
    pub fn bare(descriptor: &str) -> Self {
        FieldInput::Bare(TypeDescriptor::parse_lenient(descriptor))
    }

    pub fn into_options(self) -> FieldOptions {
        match self {
            FieldInput::Bare(descriptor) => FieldOptions::new(descriptor),
            FieldInput::Options(options) => options,
        }
    }
}

impl From<TypeDescriptor> for FieldInput {
    fn from(descriptor: TypeDescriptor) -> Self {
        FieldInput::Bare(descriptor)
    }
}

impl From<FieldOptions> for FieldInput {
    fn from(options: FieldOptions) -> Self {
        FieldInput::Options(options)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOptions {
    #[serde(rename = "type")]
    pub field_type: TypeDescriptor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FieldOptions {
    pub fn new(field_type: TypeDescriptor) -> Self {
        FieldOptions {
            field_type,
            field: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn parse(descriptor: &str) -> Result<Self> {
        Ok(Self::new(TypeDescriptor::parse(descriptor)?))
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl std::str::FromStr for FieldInput {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(FieldInput::bare(s))
    }
}
