//! SQLite-backed store persisting cache entries across runs.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::KeyValueStore;
use crate::error::StoreError;

/// Schema for the key-value table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    scope TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    written_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope, key)
);
"#;

/// SQLite-based store. All entries live in one table partitioned by scope.
pub struct SqliteStore {
  conn: Mutex<Connection>,
  scope: String,
}

impl SqliteStore {
  /// Open (or create) the store at `path`.
  pub fn open(path: &Path, scope: impl Into<String>) -> Result<Self, StoreError> {
    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(path)?;
    Self::with_connection(conn, scope.into())
  }

  /// Open a throwaway store that lives only as long as this value.
  #[cfg(test)]
  pub fn open_in_memory(scope: impl Into<String>) -> Result<Self, StoreError> {
    let conn = Connection::open_in_memory()?;
    Self::with_connection(conn, scope.into())
  }

  fn with_connection(conn: Connection, scope: String) -> Result<Self, StoreError> {
    conn.execute_batch(STORE_SCHEMA)?;
    Ok(Self {
      conn: Mutex::new(conn),
      scope,
    })
  }
}

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

    let value = conn
      .query_row(
        "SELECT value FROM kv WHERE scope = ? AND key = ?",
        params![self.scope, key],
        |row| row.get(0),
      )
      .optional()?;

    Ok(value)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;

    conn.execute(
      "INSERT OR REPLACE INTO kv (scope, key, value, written_at)
       VALUES (?, ?, ?, datetime('now'))",
      params![self.scope, key, value],
    )?;

    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
    conn.execute(
      "DELETE FROM kv WHERE scope = ? AND key = ?",
      params![self.scope, key],
    )?;
    Ok(())
  }

  fn clear(&self) -> Result<usize, StoreError> {
    let conn = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
    let removed = conn.execute("DELETE FROM kv WHERE scope = ?", params![self.scope])?;
    Ok(removed)
  }
}
