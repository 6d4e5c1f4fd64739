use crate::client::ClientError;
use crate::orm::{BatchKind, BatchOutcome};
use crate::validation::ValidationError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrmError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Type parse error: {0}")]
    TypeParse(String),

    #[error("Unknown type '{descriptor}' for property '{property}'")]
    UnknownType { property: String, descriptor: String },

    #[error("Unknown property '{property}' on model '{model}'")]
    UnknownProperty { model: String, property: String },

    #[error("Invalid value for '{property}': {message}")]
    InvalidValue { property: String, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One of the two batches was rejected by the client. `other` tells the
    /// caller what happened to the batch that ran alongside it, since that one
    /// may already be durably applied.
    #[error("{kind} batch submission failed ({} batch: {other}): {source}", .kind.other())]
    BatchSubmission {
        kind: BatchKind,
        other: BatchOutcome,
        #[source]
        source: ClientError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, OrmError>;
