#![allow(dead_code)]

use async_trait::async_trait;
use cassorm::{BatchClient, BatchOptions, ClientError, ModelSchema, Orm, Statement};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Barrier;

pub const SCHEMA: &str = r#"
keyspace: shop
models:
  product:
    table: products
    key: [sku]
    fields:
      sku: text
      title: text
      price: decimal
      tags: 'set<text>'
  productViews:
    table: product_views
    counter: true
    key: [sku]
    fields:
      sku: text
      views: counter
"#;

/// A batch the client received.
#[derive(Debug, Clone)]
pub struct Submitted {
    pub statements: Vec<Statement>,
    pub options: BatchOptions,
}

/// Records every batch. Can be told to fail regular or counter batches, to
/// delay them, or to wait on a barrier shared by both submissions.
#[derive(Default)]
pub struct RecordingClient {
    pub batches: Mutex<Vec<Submitted>>,
    pub fail_regular: bool,
    pub fail_counter: bool,
    pub delay: Option<Duration>,
    pub rendezvous: Option<Arc<Barrier>>,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(regular: bool, counter: bool) -> Self {
        RecordingClient {
            fail_regular: regular,
            fail_counter: counter,
            ..Default::default()
        }
    }

    pub fn batches(&self) -> Vec<Submitted> {
        self.batches.lock().unwrap().clone()
    }

    pub fn counter_batches(&self) -> Vec<Submitted> {
        self.batches().into_iter().filter(|b| b.options.counter).collect()
    }

    pub fn regular_batches(&self) -> Vec<Submitted> {
        self.batches().into_iter().filter(|b| !b.options.counter).collect()
    }
}

#[async_trait]
impl BatchClient for RecordingClient {
    async fn execute_batch(
        &self,
        statements: &[Statement],
        options: BatchOptions,
    ) -> Result<(), ClientError> {
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.batches.lock().unwrap().push(Submitted {
            statements: statements.to_vec(),
            options,
        });

        let fail = if options.counter { self.fail_counter } else { self.fail_regular };
        if fail {
            let kind = if options.counter { "counter" } else { "regular" };
            return Err(format!("{kind} batch rejected").into());
        }
        Ok(())
    }
}

pub fn setup(client: RecordingClient) -> (Arc<RecordingClient>, Orm<Arc<RecordingClient>>, IndexMap<String, Arc<ModelSchema>>) {
    let client = Arc::new(client);
    let orm = Orm::new(client.clone());
    let models = orm.load_schema_str(SCHEMA).unwrap();
    (client, orm, models)
}
