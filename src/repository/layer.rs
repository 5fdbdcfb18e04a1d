//! Cache-aside repository: list/get/create/update/delete over the API client,
//! with the key-value store as a best-effort response cache.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

use super::traits::{CacheResult, Resource, ResourceDescriptor};
use crate::api::api_types::unwrap_envelope;
use crate::api::ApiClient;
use crate::error::ApiError;
use crate::store::KeyValueStore;

/// What a refresh does when the network fails but a cached copy exists.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackPolicy {
  /// Return the cached copy, marked offline
  #[default]
  ServeStale,
  /// Return the error
  Propagate,
}

/// Repository for one resource type.
///
/// Reads are answered from the cache when possible; writes go to the server
/// first and patch the cached list only after the server accepted them.
pub struct CacheAsideRepository<T: Resource> {
  client: ApiClient,
  store: Arc<dyn KeyValueStore>,
  fallback: FallbackPolicy,
  _marker: PhantomData<fn() -> T>,
}

impl<T: Resource> CacheAsideRepository<T> {
  pub fn new(client: ApiClient, store: Arc<dyn KeyValueStore>, fallback: FallbackPolicy) -> Self {
    Self {
      client,
      store,
      fallback,
      _marker: PhantomData,
    }
  }

  fn descriptor(&self) -> ResourceDescriptor {
    T::DESCRIPTOR
  }

  /// List the collection.
  ///
  /// 1. Unless `refresh` is set, a cached list is returned without a network call
  /// 2. Otherwise fetch, store the collection verbatim, and return it
  /// 3. If the fetch fails and a cached list exists, apply the fallback policy
  pub async fn list(&self, refresh: bool) -> Result<CacheResult<Vec<T>>, ApiError> {
    let d = self.descriptor();
    let cached: Option<Vec<T>> = self.read_cached(d.list_key);

    if let (false, Some(items)) = (refresh, &cached) {
      tracing::debug!(key = d.list_key, count = items.len(), "list served from cache");
      return Ok(CacheResult::from_cache(items.clone()));
    }

    match self.fetch_list().await {
      Ok(items) => Ok(CacheResult::from_network(items)),
      Err(e) => match (cached, self.fallback) {
        (Some(items), FallbackPolicy::ServeStale) => {
          tracing::warn!(key = d.list_key, error = %e, "refresh failed, serving cached list");
          Ok(CacheResult::offline(items))
        }
        _ => Err(e),
      },
    }
  }

  /// Get one record by id.
  ///
  /// Looks in the cached list, then in the per-id entry, then asks the server.
  /// A fetched record is cached under its own key and left out of the list.
  pub async fn get(&self, id: &str) -> Result<CacheResult<T>, ApiError> {
    let d = self.descriptor();

    if let Some(found) = self
      .cached_list()
      .and_then(|items| items.into_iter().find(|item| item.id() == id))
    {
      return Ok(CacheResult::from_cache(found));
    }

    if let Some(found) = self.read_cached::<T>(&d.item_key(id)) {
      return Ok(CacheResult::from_cache(found));
    }

    let fallback = format!("Failed to fetch {}", d.singular);
    let body = self.client.get(&d.item_path(id)?, &fallback).await?;
    let record: T = unwrap_envelope(body, d.item_field)?;
    self.write_cached(&d.item_key(id), &record);

    Ok(CacheResult::from_network(record))
  }

  /// Create a record and append the server's copy to the cached list.
  pub async fn create(&self, attributes: Value) -> Result<T, ApiError> {
    let d = self.descriptor();
    let fallback = format!("Failed to create {}", d.singular);

    let body = self.client.post(d.collection, attributes, &fallback).await?;
    let record: T = unwrap_envelope(body, d.item_field)?;
    tracing::info!(resource = d.singular, id = %record.id(), "created");

    if let Some(mut items) = self.cached_list() {
      items.push(record.clone());
      self.write_cached(d.list_key, &items);
    }

    Ok(record)
  }

  /// Update a record and replace it in the cached list.
  ///
  /// If the server answers without a record (no body, or only an
  /// acknowledgement such as `{ "message": "updated" }`), the changes are
  /// merged into the cached copy instead.
  pub async fn update(&self, id: &str, changes: Value) -> Result<T, ApiError> {
    let d = self.descriptor();
    let fallback = format!("Failed to update {}", d.singular);

    let body = self
      .client
      .put(&d.item_path(id)?, changes.clone(), &fallback)
      .await?;

    let server_copy: Option<T> = if body.is_null() {
      None
    } else if body.get(d.item_field).is_some() {
      Some(unwrap_envelope(body, d.item_field)?)
    } else {
      serde_json::from_value(body).ok()
    };

    let mut items = self.cached_list();
    let record: T = match server_copy {
      Some(record) => record,
      None => {
        let base = items
          .as_ref()
          .and_then(|list| list.iter().find(|item| item.id() == id).cloned())
          .or_else(|| self.read_cached(&d.item_key(id)))
          .ok_or_else(|| ApiError::request_failed(fallback.clone()))?;
        merge_record(&base, &changes)?
      }
    };
    tracing::info!(resource = d.singular, id, "updated");

    if let Some(list) = items.as_mut() {
      let mut replaced = false;
      list.retain_mut(|item| {
        if item.id() != id {
          return true;
        }
        if replaced {
          // Duplicate ids from an earlier race collapse into one entry
          return false;
        }
        *item = record.clone();
        replaced = true;
        true
      });
      self.write_cached(d.list_key, &*list);
    }

    if self.read_cached::<Value>(&d.item_key(id)).is_some() {
      self.write_cached(&d.item_key(id), &record);
    }

    Ok(record)
  }

  /// Delete a record and filter it out of the cached list.
  pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
    let d = self.descriptor();
    let fallback = format!("Failed to delete {}", d.singular);

    self.client.delete(&d.item_path(id)?, &fallback).await?;
    tracing::info!(resource = d.singular, id, "deleted");

    if let Some(mut items) = self.cached_list() {
      items.retain(|item| item.id() != id);
      self.write_cached(d.list_key, &items);
    }

    if let Err(e) = self.store.remove(&d.item_key(id)) {
      tracing::warn!(key = %d.item_key(id), error = %e, "could not drop cached record");
    }

    Ok(())
  }

  /// The cached collection, if any.
  pub fn cached_list(&self) -> Option<Vec<T>> {
    self.read_cached(self.descriptor().list_key)
  }

  async fn fetch_list(&self) -> Result<Vec<T>, ApiError> {
    let d = self.descriptor();
    let fallback = format!("Failed to fetch {}", d.plural);

    let body = self.client.get(d.collection, &fallback).await?;
    let raw: Value = unwrap_envelope(body, d.list_field)?;
    let items: Vec<T> = serde_json::from_value(raw.clone()).map_err(ApiError::parse)?;

    // Store what the server sent, not our re-serialization of it
    self.write_cached(d.list_key, &raw);
    tracing::debug!(key = d.list_key, count = items.len(), "list fetched");

    Ok(items)
  }

  /// Read and decode a cache entry. Unreadable or undecodable entries are misses.
  fn read_cached<V: DeserializeOwned>(&self, key: &str) -> Option<V> {
    let raw = match self.store.get(key) {
      Ok(raw) => raw?,
      Err(e) => {
        tracing::warn!(key, error = %e, "cache read failed");
        return None;
      }
    };

    match serde_json::from_str(&raw) {
      Ok(value) => Some(value),
      Err(e) => {
        tracing::warn!(key, error = %e, "ignoring undecodable cache entry");
        None
      }
    }
  }

  /// Write a cache entry. Failures are logged and otherwise ignored.
  fn write_cached<V: Serialize + ?Sized>(&self, key: &str, value: &V) {
    let encoded = match serde_json::to_string(value) {
      Ok(encoded) => encoded,
      Err(e) => {
        tracing::warn!(key, error = %e, "could not encode cache entry");
        return;
      }
    };

    if let Err(e) = self.store.set(key, &encoded) {
      tracing::warn!(key, error = %e, "cache write failed");
    }
  }
}

impl<T: Resource> Clone for CacheAsideRepository<T> {
  fn clone(&self) -> Self {
    Self {
      client: self.client.clone(),
      store: Arc::clone(&self.store),
      fallback: self.fallback,
      _marker: PhantomData,
    }
  }
}

/// Shallow-merge `changes` over the fields of `base`.
fn merge_record<T: Resource>(base: &T, changes: &Value) -> Result<T, ApiError> {
  let mut merged = serde_json::to_value(base).map_err(ApiError::parse)?;
  if let (Value::Object(target), Value::Object(patch)) = (&mut merged, changes) {
    for (field, value) in patch {
      target.insert(field.clone(), value.clone());
    }
  }
  serde_json::from_value(merged).map_err(ApiError::parse)
}
