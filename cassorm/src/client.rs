//! The seam to the database driver.
//!
//! cassorm never talks to the network itself. Whatever executes batches
//! implements [`BatchClient`]; the driver owns connections, retries,
//! consistency and timeouts.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// One write: query text plus positional parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub query: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(query: impl Into<String>, params: Vec<Value>) -> Self {
        Statement {
            query: query.into(),
            params,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.query, Value::Array(self.params.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Execute as a counter batch.
    pub counter: bool,
}

/// Error type reported by a client; passed through to the caller untouched.
pub type ClientError = Box<dyn std::error::Error + Send + Sync>;

#[async_trait]
pub trait BatchClient: Send + Sync {
    /// Apply `statements` atomically as one batch.
    async fn execute_batch(
        &self,
        statements: &[Statement],
        options: BatchOptions,
    ) -> std::result::Result<(), ClientError>;
}

#[async_trait]
impl<C: BatchClient + ?Sized> BatchClient for Arc<C> {
    async fn execute_batch(
        &self,
        statements: &[Statement],
        options: BatchOptions,
    ) -> std::result::Result<(), ClientError> {
        (**self).execute_batch(statements, options).await
    }
}

#[async_trait]
impl<C: BatchClient + ?Sized> BatchClient for Box<C> {
    async fn execute_batch(
        &self,
        statements: &[Statement],
        options: BatchOptions,
    ) -> std::result::Result<(), ClientError> {
        (**self).execute_batch(statements, options).await
    }
}
