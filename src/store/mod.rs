//! Persistent key-value store used as a best-effort response cache.
//!
//! Values are JSON strings addressed by fixed keys (`buckets`, `products:42`).
//! Every store is scoped to one API origin so that two consoles pointed at
//! different deployments never see each other's entries.

mod memory;
mod sqlite;

use sha2::{Digest, Sha256};

use crate::error::StoreError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Synchronous string-keyed storage with no expiry and no transactions.
pub trait KeyValueStore: Send + Sync {
  /// Read the value stored under `key`.
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

  /// Store `value` under `key`, replacing any previous value.
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

  /// Remove `key` if present.
  fn remove(&self, key: &str) -> Result<(), StoreError>;

  /// Remove every entry in this store's scope, returning how many were dropped.
  fn clear(&self) -> Result<usize, StoreError>;

  /// Whether entries outlive the process.
  fn is_persistent(&self) -> bool {
    true
  }
}

/// Store that never holds anything.
/// Used when caching is disabled - every read misses.
pub struct NoopStore;

impl KeyValueStore for NoopStore {
  fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
    Ok(None) // Always miss
  }

  fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
    Ok(()) // Discard
  }

  fn remove(&self, _key: &str) -> Result<(), StoreError> {
    Ok(())
  }

  fn clear(&self) -> Result<usize, StoreError> {
    Ok(0)
  }

  fn is_persistent(&self) -> bool {
    false
  }
}

/// Derive the storage scope for an API base URL.
///
/// Trailing slashes and letter case of the URL are ignored.
pub fn origin_scope(base_url: &str) -> String {
  let normalized = base_url.trim().trim_end_matches('/').to_lowercase();

  let mut hasher = Sha256::new();
  hasher.update(normalized.as_bytes());
  let digest = hex::encode(hasher.finalize());
  digest[..16].to_string()
}
