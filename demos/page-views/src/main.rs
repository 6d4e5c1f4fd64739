use async_trait::async_trait;
use cassorm::{BatchClient, BatchOptions, ClientError, Model, Orm, Statement};

const SCHEMA: &str = r#"
keyspace: analytics
models:
  page:
    table: pages
    key: [pageId]
    fields:
      pageId: uuid
      title: text
      publishedAt: timestamp
      tags: 'set<text>'
  pageView:
    table: page_views
    counter: true
    key: [pageId, day]
    fields:
      pageId: uuid
      day: date
      views: counter
"#;

/// Prints batches instead of sending them anywhere.
struct LoggingClient;

#[async_trait]
impl BatchClient for LoggingClient {
    async fn execute_batch(
        &self,
        statements: &[Statement],
        options: BatchOptions,
    ) -> Result<(), ClientError> {
        let label = if options.counter { "BEGIN COUNTER BATCH" } else { "BEGIN BATCH" };
        println!("{label}");
        for statement in statements {
            println!("  {statement}");
        }
        println!("APPLY BATCH");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> cassorm::Result<()> {
    env_logger::init();

    let orm = Orm::new(LoggingClient);
    let models = orm.load_schema_str(SCHEMA)?;
    let page_id = "5f0c7a9e-8d43-4c1b-9a51-2c3e8f6d7b10";

    let page = Model::new(models["page"].clone())
        .with("pageId", page_id)?
        .with("title", "Hello, columns")?
        .with("publishedAt", "2026-02-13T09:00:00Z")?
        .with("tags", serde_json::json!(["intro", "cql"]))?;

    let mut views = Model::new(models["pageView"].clone())
        .with("pageId", page_id)?
        .with("day", "2026-02-13")?;
    views.increment("views", 1)?;

    let report = orm.save_all(&[&page, &views]).await?;
    log::info!("regular batch: {}, counter batch: {}", report.regular, report.counter);

    let invalid = Model::new(models["page"].clone()).with("title", 42)?;
    match orm.save(&invalid).await {
        Err(e) => println!("rejected before any write:\n{e}"),
        Ok(_) => println!("unexpectedly saved an invalid page"),
    }

    Ok(())
}
