//! Schema-driven object mapper for column-family databases.
//!
//! Declare models in YAML (or build [`ModelDefinition`]s in code), let the
//! [`TypeRegistry`] resolve each field's type, create [`Model`]s and hand them
//! to [`Orm::save_all`], which validates everything up front and writes
//! through two batches: one for regular tables, one for counter tables.
//!
//! ```no_run
//! # async fn demo(client: impl cassorm::BatchClient) -> cassorm::Result<()> {
//! use cassorm::{Model, Orm};
//!
//! let orm = Orm::new(client);
//! let models = orm.load_schema_str(
//!     "models:\n  user:\n    key: [id]\n    fields:\n      id: uuid\n      fullName: text\n",
//! )?;
//! let user = Model::new(models["user"].clone())
//!     .with("id", "123e4567-e89b-42d3-a456-426614174000")?
//!     .with("fullName", "Alice")?;
//! orm.save(&user).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod model;
pub mod orm;
pub mod schema;
pub mod types;
pub mod validation;

pub use client::{BatchClient, BatchOptions, ClientError, Statement};
pub use error::{OrmError, Result};
pub use model::{Model, ModelSchema, Saveable};
pub use orm::{partition, BatchKind, BatchOutcome, Orm, Partition, SaveReport};
pub use schema::{FieldInput, FieldOptions, FieldSpec, ModelDefinition, Schema, SchemaDefinition};
pub use types::{HandlerKind, TypeDescriptor, TypeHandler, TypeRegistry};
pub use validation::{FieldIssue, ValidationError};
