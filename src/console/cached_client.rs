//! Console client bundling the session, the API client and one cache-aside
//! repository per resource type.

use color_eyre::{eyre::eyre, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::api::api_types::unwrap_envelope;
use crate::api::{ApiClient, HttpTransport, Transport};
use crate::config::{CacheBackend, Config};
use crate::error::{ApiError, StoreError};
use crate::repository::{CacheAsideRepository, FallbackPolicy, Resource};
use crate::session::Session;
use crate::store::{origin_scope, KeyValueStore, MemoryStore, NoopStore, SqliteStore};

use super::types::{Application, Bucket, Product, WaitlistProject};

/// Outcome of refreshing one resource list during a sync.
#[derive(Debug)]
pub struct SyncOutcome {
  pub resource: &'static str,
  pub result: Result<usize, ApiError>,
}

#[derive(Clone)]
pub struct ConsoleClient {
  api: ApiClient,
  store: Arc<dyn KeyValueStore>,
  pub buckets: CacheAsideRepository<Bucket>,
  pub apps: CacheAsideRepository<Application>,
  pub products: CacheAsideRepository<Product>,
  pub waitlists: CacheAsideRepository<WaitlistProject>,
}

impl ConsoleClient {
  /// Build a client talking to the configured service.
  pub fn new(config: &Config) -> Result<Self> {
    let transport = HttpTransport::new(
      &config.api.base_url,
      Duration::from_secs(config.api.timeout_secs),
    )
    .map_err(|e| eyre!("{}", e))?;

    let store = open_store(config)?;

    Ok(Self::from_parts(
      Arc::new(transport),
      store,
      Config::env_token(),
      config.cache.fallback,
    ))
  }

  pub fn from_parts(
    transport: Arc<dyn Transport>,
    store: Arc<dyn KeyValueStore>,
    env_token: Option<String>,
    fallback: FallbackPolicy,
  ) -> Self {
    let session = Arc::new(Session::load(Arc::clone(&store), env_token));
    let api = ApiClient::new(transport, session);

    Self {
      buckets: CacheAsideRepository::new(api.clone(), Arc::clone(&store), fallback),
      apps: CacheAsideRepository::new(api.clone(), Arc::clone(&store), fallback),
      products: CacheAsideRepository::new(api.clone(), Arc::clone(&store), fallback),
      waitlists: CacheAsideRepository::new(api.clone(), Arc::clone(&store), fallback),
      api,
      store,
    }
  }

  pub fn api(&self) -> &ApiClient {
    &self.api
  }

  /// Add a document to a bucket.
  ///
  /// `raw` is free-form JSON typed by the user; it is parsed locally so a
  /// typo is reported with the parser's message before anything is sent.
  pub async fn put_bucket_data(&self, bucket_id: &str, raw: &str) -> Result<Value, ApiError> {
    let document: Value = serde_json::from_str(raw).map_err(ApiError::parse)?;

    let path = format!("{}/data", Bucket::DESCRIPTOR.item_path(bucket_id)?);
    let body = self
      .api
      .post(&path, document, "Failed to add data to bucket")
      .await?;

    unwrap_envelope(body, "data")
  }

  /// Refresh every resource list concurrently.
  pub async fn sync(&self) -> Vec<SyncOutcome> {
    let (buckets, apps, products, waitlists) = futures::join!(
      self.buckets.list(true),
      self.apps.list(true),
      self.products.list(true),
      self.waitlists.list(true)
    );

    vec![
      outcome::<Bucket>(buckets.map(|r| r.data.len())),
      outcome::<Application>(apps.map(|r| r.data.len())),
      outcome::<Product>(products.map(|r| r.data.len())),
      outcome::<WaitlistProject>(waitlists.map(|r| r.data.len())),
    ]
  }

  /// Drop every cached response for this origin. The session survives.
  pub fn clear_cache(&self) -> Result<usize, StoreError> {
    let session = self.api.session();
    let token = session.stored();

    let removed = self.store.clear()?;

    match token {
      Some(token) => {
        session.set_token(&token);
        Ok(removed.saturating_sub(1))
      }
      None => Ok(removed),
    }
  }
}

fn outcome<T: Resource>(result: Result<usize, ApiError>) -> SyncOutcome {
  SyncOutcome {
    resource: T::DESCRIPTOR.plural,
    result,
  }
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>> {
  let scope = origin_scope(&config.api.base_url);

  let store: Arc<dyn KeyValueStore> = match config.cache.backend {
    CacheBackend::Sqlite => {
      let path = match &config.cache.path {
        Some(p) => p.clone(),
        None => Config::data_dir()
          .ok_or_else(|| eyre!("Could not determine data directory"))?
          .join("cache.db"),
      };
      tracing::debug!(path = %path.display(), %scope, "opening cache");
      let store = SqliteStore::open(&path, scope)
        .map_err(|e| eyre!("Failed to open cache at {}: {}", path.display(), e))?;
      Arc::new(store)
    }
    CacheBackend::Memory => Arc::new(MemoryStore::new()),
    CacheBackend::None => Arc::new(NoopStore),
  };

  Ok(store)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::testing::ScriptedTransport;
  use crate::api::transport::Method;
  use serde_json::json;

  fn console(transport: &Arc<ScriptedTransport>, store: &Arc<MemoryStore>) -> ConsoleClient {
    let transport: Arc<dyn Transport> = transport.clone();
    let store: Arc<dyn KeyValueStore> = store.clone();
    ConsoleClient::from_parts(transport, store, None, FallbackPolicy::ServeStale)
  }

  #[tokio::test]
  async fn test_put_bucket_data_rejects_malformed_json_locally() {
    let transport = Arc::new(ScriptedTransport::new());
    let store = Arc::new(MemoryStore::new());
    let client = console(&transport, &store);
    client.api().session().set_token("tok");

    let err = client.put_bucket_data("b1", "{ \"a\": ").await.unwrap_err();

    assert!(matches!(err, ApiError::Parse { .. }));
    assert!(err.to_string().contains("EOF"));
    assert_eq!(transport.request_count(), 0);
  }

  #[tokio::test]
  async fn test_put_bucket_data_posts_document() {
    let transport = Arc::new(ScriptedTransport::new());
    let store = Arc::new(MemoryStore::new());
    let client = console(&transport, &store);
    client.api().session().set_token("tok");
    transport.respond(
      Method::Post,
      "/buckets/b1/data",
      201,
      json!({ "data": { "id": "d1", "score": 3 } }),
    );

    let stored = client.put_bucket_data("b1", r#"{"score": 3}"#).await.unwrap();

    assert_eq!(stored["id"], "d1");
    assert_eq!(transport.requests()[0].body, Some(json!({ "score": 3 })));
  }

  #[tokio::test]
  async fn test_sync_reports_each_resource() {
    let transport = Arc::new(ScriptedTransport::new());
    let store = Arc::new(MemoryStore::new());
    let client = console(&transport, &store);
    client.api().session().set_token("tok");
    transport
      .respond(Method::Get, "/buckets", 200, json!({ "buckets": [{ "id": "b1" }] }))
      .respond(Method::Get, "/apps", 200, json!({ "apps": [] }))
      .respond(
        Method::Get,
        "/products",
        500,
        json!({ "message": "Failed to fetch products" }),
      )
      .respond(
        Method::Get,
        "/waitlists",
        200,
        json!({ "waitlists": [{ "id": 1 }, { "id": 2 }] }),
      );

    let outcomes = client.sync().await;

    let summary: Vec<(&str, Result<usize, String>)> = outcomes
      .into_iter()
      .map(|o| (o.resource, o.result.map_err(|e| e.to_string())))
      .collect();
    assert_eq!(
      summary,
      vec![
        ("buckets", Ok(1)),
        ("applications", Ok(0)),
        ("products", Err("Failed to fetch products".to_string())),
        ("waitlist projects", Ok(2)),
      ]
    );
  }

  #[tokio::test]
  async fn test_clear_cache_keeps_session() {
    let transport = Arc::new(ScriptedTransport::new());
    let store = Arc::new(MemoryStore::new());
    let client = console(&transport, &store);
    client.api().session().set_token("tok");
    store.set("buckets", "[]").unwrap();
    store.set("apps", "[]").unwrap();

    let removed = client.clear_cache().unwrap();

    assert_eq!(removed, 2);
    assert_eq!(store.get("buckets").unwrap(), None);
    assert_eq!(client.api().session().token().unwrap(), "tok");
  }

  #[tokio::test]
  async fn test_repositories_share_one_session() {
    let transport = Arc::new(ScriptedTransport::new());
    let store = Arc::new(MemoryStore::new());
    let client = console(&transport, &store);

    assert_eq!(
      client.products.list(false).await.unwrap_err(),
      ApiError::MissingCredential
    );

    client.api().session().set_token("tok");
    transport.respond(Method::Get, "/products", 200, json!({ "products": [] }));
    assert!(client.products.list(false).await.is_ok());
  }
}
