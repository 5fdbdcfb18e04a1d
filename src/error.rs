//! Error kinds surfaced by the API client and the cache store.

use thiserror::Error;

/// Failure of a remote or repository operation.
///
/// Deliberately coarse: the caller only ever needs a message to show next to
/// the action that triggered it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
  /// No usable bearer token when an authenticated call was attempted.
  #[error("Not logged in. Run `consolectl login` or set CONSOLECTL_TOKEN.")]
  MissingCredential,

  /// Non-2xx response or transport failure.
  #[error("{message}")]
  RequestFailed { message: String },

  /// Malformed JSON, either typed by the user or returned by the server.
  #[error("{message}")]
  Parse { message: String },
}

impl ApiError {
  pub fn request_failed(message: impl Into<String>) -> Self {
    Self::RequestFailed {
      message: message.into(),
    }
  }

  pub fn parse(err: serde_json::Error) -> Self {
    Self::Parse {
      message: err.to_string(),
    }
  }
}

/// Failure of the persistent key-value store.
#[derive(Debug, Error)]
pub enum StoreError {
  #[error("cache database error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("cache directory error: {0}")]
  Io(#[from] std::io::Error),

  #[error("cache lock poisoned")]
  Poisoned,
}
