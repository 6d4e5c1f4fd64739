use crate::model::ModelSchema;
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;

/// One offending property.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub property: String,
    pub message: String,
}

/// A model failed validation. Lists every offending property.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub model: String,
    pub issues: Vec<FieldIssue>,
}

impl ValidationError {
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.issues.iter().map(|issue| issue.property.as_str())
    }

    pub fn mentions(&self, property: &str) -> bool {
        self.properties().any(|p| p == property)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model '{}' failed validation:", self.model)?;
        for issue in &self.issues {
            write!(f, "\n  - {}: {}", issue.property, issue.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Result of validating a model's values
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub issues: Vec<FieldIssue>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.issues.is_empty()
    }

    pub(crate) fn add_issue(&mut self, property: &str, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            property: property.to_string(),
            message: message.into(),
        });
    }

    pub fn into_result(self, model: &str) -> Result<(), ValidationError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(ValidationError {
                model: model.to_string(),
                issues: self.issues,
            })
        }
    }
}

/// Validate a model's values against its schema.
/// Every primary key property must be present and non-null; every other
/// non-null value must satisfy its field's type handler.
pub fn validate_values(schema: &ModelSchema, values: &IndexMap<String, Value>) -> ValidationResult {
    let mut result = ValidationResult::default();

    for key in schema.primary_key() {
        match values.get(key) {
            None | Some(Value::Null) => result.add_issue(key, "primary key value is missing"),
            Some(_) => {}
        }
    }

    for (property, spec) in schema.fields().iter() {
        let value = match values.get(property) {
            Some(value) if !value.is_null() => value,
            _ => continue,
        };
        if let Err(message) = spec
            .handler
            .validate(schema.registry(), &spec.field_type, value)
        {
            result.add_issue(property, message);
        }
    }

    result
}
