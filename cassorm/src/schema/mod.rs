pub mod normalize;
pub mod parser;
pub mod types;

pub use normalize::{normalize, normalize_property, normalize_strict, snake_case, FieldSpec, Schema};
pub use parser::{parse_schema, parse_schema_str};
pub use types::{FieldInput, FieldOptions, ModelDefinition, RawSchema, SchemaDefinition};
