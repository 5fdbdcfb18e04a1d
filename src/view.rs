//! Command views: run one repository operation as a cancellable query and
//! render its outcome.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::future::Future;

use crate::console::types::RecordSummary;
use crate::query::{Query, QueryState};
use crate::render;
use crate::repository::{CacheAsideRepository, Resource};

/// Run `fetcher` to completion, cancelling it on Ctrl-C.
pub async fn run_query<T, F, Fut>(fetcher: F) -> Result<T>
where
  T: Send + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, String>> + Send + 'static,
{
  run_query_until(fetcher, async {
    let _ = tokio::signal::ctrl_c().await;
  })
  .await
}

/// Run `fetcher` until it settles or `interrupt` resolves, whichever is first.
async fn run_query_until<T, F, Fut>(fetcher: F, interrupt: impl Future<Output = ()>) -> Result<T>
where
  T: Send + 'static,
  F: Fn() -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<T, String>> + Send + 'static,
{
  let mut query = Query::new(fetcher);
  query.fetch();

  let interrupted = tokio::select! {
    _ = interrupt => true,
    _ = query.settle() => false,
  };

  if interrupted {
    query.cancel();
    return Err(eyre!("Interrupted"));
  }

  match query.into_state() {
    QueryState::Success(data) => Ok(data),
    QueryState::Error(message) => Err(eyre!(message)),
    QueryState::Cancelled => Err(eyre!("Request was cancelled")),
    QueryState::Idle | QueryState::Loading => Err(eyre!("Request did not complete")),
  }
}

/// One operation on a resource collection.
#[derive(Debug, Clone)]
pub enum ResourceOp {
  List { refresh: bool },
  Get { id: String },
  Create { body: Value },
  Update { id: String, body: Value },
  Delete { id: String },
}

pub struct ResourceView<T: Resource> {
  repo: CacheAsideRepository<T>,
  json: bool,
}

impl<T: Resource + RecordSummary> ResourceView<T> {
  pub fn new(repo: CacheAsideRepository<T>, json: bool) -> Self {
    Self { repo, json }
  }

  /// Execute `op` and return the text to print.
  pub async fn run(&self, op: ResourceOp) -> Result<String> {
    let repo = self.repo.clone();
    let d = T::DESCRIPTOR;

    match op {
      ResourceOp::List { refresh } => {
        let result = run_query(move || {
          let repo = repo.clone();
          async move { repo.list(refresh).await.map_err(|e| e.to_string()) }
        })
        .await?;

        if self.json {
          return Ok(render::json(&result.data));
        }
        let mut out = render::table(&result.data);
        out.push_str(&render::source_note(result.source, result.data.len(), d.plural));
        Ok(out)
      }
      ResourceOp::Get { id } => {
        let result = run_query(move || {
          let repo = repo.clone();
          let id = id.clone();
          async move { repo.get(&id).await.map_err(|e| e.to_string()) }
        })
        .await?;

        Ok(self.render_one(&result.data))
      }
      ResourceOp::Create { body } => {
        let record = run_query(move || {
          let repo = repo.clone();
          let body = body.clone();
          async move { repo.create(body).await.map_err(|e| e.to_string()) }
        })
        .await?;

        Ok(self.render_one(&record))
      }
      ResourceOp::Update { id, body } => {
        let record = run_query(move || {
          let repo = repo.clone();
          let id = id.clone();
          let body = body.clone();
          async move { repo.update(&id, body).await.map_err(|e| e.to_string()) }
        })
        .await?;

        Ok(self.render_one(&record))
      }
      ResourceOp::Delete { id } => {
        let deleted = id.clone();
        run_query(move || {
          let repo = repo.clone();
          let id = id.clone();
          async move { repo.delete(&id).await.map_err(|e| e.to_string()) }
        })
        .await?;

        Ok(format!("Deleted {} {}", d.singular, deleted))
      }
    }
  }

  fn render_one(&self, record: &T) -> String {
    if self.json {
      render::json(record)
    } else {
      render::table(std::slice::from_ref(record))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::ScriptedTransport;
  use crate::api::transport::Method;
  use crate::api::ApiClient;
  use crate::console::types::Bucket;
  use crate::repository::FallbackPolicy;
  use crate::session::Session;
  use crate::store::{KeyValueStore, MemoryStore};
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn bucket_view(transport: &Arc<ScriptedTransport>, json: bool) -> ResourceView<Bucket> {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let session = Arc::new(Session::load(Arc::clone(&store), Some("tok".into())));
    let client = ApiClient::new(transport.clone(), session);
    ResourceView::new(
      CacheAsideRepository::new(client, store, FallbackPolicy::ServeStale),
      json,
    )
  }

  #[tokio::test]
  async fn test_list_renders_table_with_source() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond(
      Method::Get,
      "/buckets",
      200,
      json!({ "buckets": [{ "id": "b1", "name": "alpha" }] }),
    );
    let view = bucket_view(&transport, false);

    let first = view.run(ResourceOp::List { refresh: false }).await.unwrap();
    assert!(first.contains("alpha"));
    assert!(first.ends_with("1 buckets (network)"));

    let second = view.run(ResourceOp::List { refresh: false }).await.unwrap();
    assert!(second.ends_with("1 buckets (cache)"));
  }

  #[tokio::test]
  async fn test_failure_becomes_report_with_server_message() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond(
      Method::Delete,
      "/buckets/b1",
      403,
      json!({ "message": "Not allowed" }),
    );
    let view = bucket_view(&transport, false);

    let err = view
      .run(ResourceOp::Delete { id: "b1".into() })
      .await
      .unwrap_err();
    assert_eq!(err.to_string(), "Not allowed");
  }

  #[tokio::test]
  async fn test_create_renders_json() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.respond(
      Method::Post,
      "/buckets",
      201,
      json!({ "bucket": { "id": "b7", "name": "new" } }),
    );
    let view = bucket_view(&transport, true);

    let out = view
      .run(ResourceOp::Create {
        body: json!({ "name": "new" }),
      })
      .await
      .unwrap();
    let parsed: Value = serde_json::from_str(&out).unwrap();
    assert_eq!(parsed, json!({ "id": "b7", "name": "new" }));
  }

  #[tokio::test]
  async fn test_interrupt_cancels_query() {
    let result: Result<u32> = run_query_until(
      || async {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(1)
      },
      tokio::time::sleep(Duration::from_millis(10)),
    )
    .await;

    assert_eq!(result.unwrap_err().to_string(), "Interrupted");
  }
}
