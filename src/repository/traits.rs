//! Core traits and types for the cache-aside repository.

use serde::{de::DeserializeOwned, Serialize};
use url::Url;

use crate::error::ApiError;

/// Where a resource lives on the API and in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
  /// Cache key holding the full collection (e.g. "buckets").
  /// Single records fetched by id are stored under `<list_key>:<id>`.
  pub list_key: &'static str,
  /// Collection endpoint (e.g. "/buckets"); items live at `<collection>/<id>`
  pub collection: &'static str,
  /// Envelope field of a list response (`{ "buckets": [...] }`)
  pub list_field: &'static str,
  /// Envelope field of a single-record response (`{ "bucket": {...} }`)
  pub item_field: &'static str,
  /// Plural display name used in fallback error messages
  pub plural: &'static str,
  /// Singular display name used in fallback error messages
  pub singular: &'static str,
}

impl ResourceDescriptor {
  /// Path of one record. The id is sent as a single percent-encoded segment.
  pub fn item_path(&self, id: &str) -> Result<String, ApiError> {
    if id.is_empty() || id == "." || id == ".." {
      return Err(ApiError::request_failed(format!("Invalid {} id '{}'", self.singular, id)));
    }

    let mut url = Url::parse("http://localhost/").map_err(|e| ApiError::request_failed(e.to_string()))?;
    url
      .path_segments_mut()
      .map_err(|_| ApiError::request_failed(format!("Invalid {} id '{}'", self.singular, id)))?
      .pop_if_empty()
      .push(id);

    Ok(format!("{}{}", self.collection, url.path()))
  }

  pub fn item_key(&self, id: &str) -> String {
    format!("{}:{}", self.list_key, id)
  }
}

/// A record type served by the console API.
pub trait Resource: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
  const DESCRIPTOR: ResourceDescriptor;

  /// Server-assigned identifier, rendered as a string for comparisons.
  fn id(&self) -> String;
}

/// Result from a repository read, including where the data came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Create a new cache result from cached data.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Cache,
    }
  }

  /// Create a new cache result for offline mode.
  pub fn offline(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
    }
  }
}

/// Indicates where returned data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Served from the cache without a network call
  Cache,
  /// Refresh failed, serving the cached copy instead
  Offline,
}

impl CacheSource {
  pub fn label(&self) -> &'static str {
    match self {
      CacheSource::Network => "network",
      CacheSource::Cache => "cache",
      CacheSource::Offline => "offline (stale cache)",
    }
  }
}
