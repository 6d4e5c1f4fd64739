use crate::client::{BatchClient, BatchOptions, ClientError, Statement};
use crate::error::{OrmError, Result};
use crate::model::{ModelSchema, Saveable};
use crate::schema::{parse_schema_str, ModelDefinition, SchemaDefinition};
use crate::types::TypeRegistry;
use futures::future::try_join_all;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

/// Which of the two batches a save issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Regular,
    Counter,
}

impl BatchKind {
    pub fn other(self) -> BatchKind {
        match self {
            BatchKind::Regular => BatchKind::Counter,
            BatchKind::Counter => BatchKind::Regular,
        }
    }
}

impl fmt::Display for BatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchKind::Regular => f.write_str("regular"),
            BatchKind::Counter => f.write_str("counter"),
        }
    }
}

/// What happened to one batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    Applied { statements: usize },
    /// Nothing to write; the client was not called.
    Skipped,
    Failed,
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::Applied { statements } => write!(f, "applied {statements} statement(s)"),
            BatchOutcome::Skipped => f.write_str("skipped"),
            BatchOutcome::Failed => f.write_str("failed"),
        }
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    pub regular: BatchOutcome,
    pub counter: BatchOutcome,
}

/// Statements of a set of models, split by batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub regular: Vec<Statement>,
    pub counter: Vec<Statement>,
}

impl Partition {
    pub fn is_empty(&self) -> bool {
        self.regular.is_empty() && self.counter.is_empty()
    }
}

/// Route each model's statements to the regular or the counter batch, in
/// model order. The storage engine refuses batches mixing the two.
pub fn partition<M: Saveable>(models: &[M]) -> Partition {
    let mut partition = Partition::default();
    for model in models {
        let statements = model.save_statements();
        if model.is_counter() {
            partition.counter.extend(statements);
        } else {
            partition.regular.extend(statements);
        }
    }
    partition
}

/// The main entry point: owns the database client and the type registry,
/// builds model schemas and saves models.
pub struct Orm<C> {
    client: C,
    registry: Arc<TypeRegistry>,
}

impl<C: BatchClient> Orm<C> {
    /// An ORM over `client` with the built-in types.
    pub fn new(client: C) -> Self {
        Self::with_registry(client, Arc::new(TypeRegistry::with_builtins()))
    }

    /// An ORM over `client` using a custom type registry.
    pub fn with_registry(client: C, registry: Arc<TypeRegistry>) -> Self {
        Orm { client, registry }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Build one model schema.
    pub fn define(&self, name: &str, definition: &ModelDefinition) -> Result<Arc<ModelSchema>> {
        Ok(Arc::new(ModelSchema::new(name, definition, self.registry.clone())?))
    }

    /// Build every model of a schema document.
    pub fn load_schema(&self, definition: &SchemaDefinition) -> Result<IndexMap<String, Arc<ModelSchema>>> {
        definition.build(&self.registry)
    }

    /// Parse a YAML schema document and build its models.
    pub fn load_schema_str(&self, yaml: &str) -> Result<IndexMap<String, Arc<ModelSchema>>> {
        self.load_schema(&parse_schema_str(yaml)?)
    }

    /// Save a single model.
    pub async fn save<M: Saveable + ?Sized>(&self, model: &M) -> Result<SaveReport> {
        self.save_all(std::slice::from_ref(&model)).await
    }

    /// Save models through the client's native batches.
    ///
    /// 1. Every model is validated concurrently; the first failure aborts
    ///    the save before anything is generated or sent.
    /// 2. Statements are split into a regular and a counter batch.
    /// 3. Both batches are submitted concurrently and both run to
    ///    completion. An empty batch is skipped.
    ///
    /// If either batch fails the error names it and reports what happened to
    /// the other one, which may already be applied. If both fail, the error
    /// is the regular batch's, with the counter batch reported as
    /// [`BatchOutcome::Failed`].
    ///
    /// Changing a counter row's primary key is not fully supported: the old
    /// counter is deleted, which the engine only hides. Writing the old key
    /// again later resumes from the last value, not from zero.
    pub async fn save_all<M: Saveable>(&self, models: &[M]) -> Result<SaveReport> {
        try_join_all(models.iter().map(|model| model.validate())).await?;

        let Partition { regular, counter } = partition(models);
        log::debug!(
            "Saving {} model(s): {} regular, {} counter statement(s)",
            models.len(),
            regular.len(),
            counter.len()
        );
        for statement in regular.iter().chain(&counter) {
            log::debug!("  {statement}");
        }

        let (regular_result, counter_result) = futures::join!(
            self.submit(&regular, BatchKind::Regular),
            self.submit(&counter, BatchKind::Counter)
        );

        let report = match (regular_result, counter_result) {
            (Ok(regular), Ok(counter)) => SaveReport { regular, counter },
            (Err(source), counter) => {
                return Err(OrmError::BatchSubmission {
                    kind: BatchKind::Regular,
                    other: counter.unwrap_or(BatchOutcome::Failed),
                    source,
                })
            }
            (Ok(regular), Err(source)) => {
                return Err(OrmError::BatchSubmission {
                    kind: BatchKind::Counter,
                    other: regular,
                    source,
                })
            }
        };

        log::info!(
            "Saved {} model(s) (regular: {}, counter: {})",
            models.len(),
            report.regular,
            report.counter
        );
        Ok(report)
    }

    async fn submit(
        &self,
        statements: &[Statement],
        kind: BatchKind,
    ) -> std::result::Result<BatchOutcome, ClientError> {
        if statements.is_empty() {
            return Ok(BatchOutcome::Skipped);
        }
        let options = BatchOptions {
            counter: kind == BatchKind::Counter,
        };
        match self.client.execute_batch(statements, options).await {
            Ok(()) => Ok(BatchOutcome::Applied {
                statements: statements.len(),
            }),
            Err(e) => {
                log::warn!("{kind} batch of {} statement(s) failed: {e}", statements.len());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Model;
    use serde_json::json;

    #[derive(Default)]
    struct NullClient;

    #[async_trait::async_trait]
    impl BatchClient for NullClient {
        async fn execute_batch(
            &self,
            _statements: &[Statement],
            _options: BatchOptions,
        ) -> std::result::Result<(), ClientError> {
            Ok(())
        }
    }

    const SCHEMA: &str = r#"
models:
  user:
    key: [id]
    fields:
      id: int
      name: text
  hits:
    counter: true
    key: [id]
    fields:
      id: int
      total: counter
"#;

    #[test]
    fn test_partition_routes_by_counter_flag() {
        let orm = Orm::new(NullClient);
        let models = orm.load_schema_str(SCHEMA).unwrap();
        let user = Model::new(models["user"].clone()).with("id", 1).unwrap();
        let mut hits = Model::new(models["hits"].clone()).with("id", 1).unwrap();
        hits.increment("total", 2).unwrap();
        let other = Model::new(models["user"].clone()).with("id", 2).unwrap();

        let split = partition(&[&user, &hits, &other]);
        assert_eq!(split.regular.len(), 2);
        assert_eq!(split.counter.len(), 1);
        assert_eq!(split.regular[0].params, vec![json!(1)]);
        assert_eq!(split.regular[1].params, vec![json!(2)]);
        assert!(split.counter[0].query.starts_with("UPDATE hits SET total = total + ?"));
    }

    #[test]
    fn test_partition_of_nothing() {
        let models: Vec<Model> = Vec::new();
        assert!(partition(&models).is_empty());
    }

    #[test]
    fn test_batch_kind_display() {
        assert_eq!(BatchKind::Regular.to_string(), "regular");
        assert_eq!(BatchKind::Counter.other(), BatchKind::Regular);
        assert_eq!(BatchOutcome::Applied { statements: 2 }.to_string(), "applied 2 statement(s)");
    }

    #[test]
    fn test_define_uses_orm_registry() {
        let orm = Orm::new(NullClient);
        let definition = ModelDefinition::new(["id"])
            .field("id", "int".parse().unwrap())
            .field("name", "text".parse().unwrap());
        let schema = orm.define("account", &definition).unwrap();
        assert!(Arc::ptr_eq(schema.registry(), orm.registry()));
        assert_eq!(schema.table(), "account");
    }

    #[tokio::test]
    async fn test_save_single_model() {
        let orm = Orm::new(NullClient);
        let models = orm.load_schema_str(SCHEMA).unwrap();
        let user = Model::new(models["user"].clone()).with("id", 1).unwrap();
        let report = orm.save(&user).await.unwrap();
        assert_eq!(report.regular, BatchOutcome::Applied { statements: 1 });
        assert_eq!(report.counter, BatchOutcome::Skipped);
    }
}
