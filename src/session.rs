//! Bearer token lifecycle.
//!
//! The token is set on login, cleared on logout or expiry, and read through
//! [`Session::token`] everywhere else. It is persisted in the key-value store
//! next to the cached responses, like the browser console kept it.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::sync::{Arc, RwLock};

use crate::error::ApiError;
use crate::store::KeyValueStore;

const TOKEN_KEY: &str = "session:token";

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
  LoggedOut,
  Active {
    expires_at: Option<DateTime<Utc>>,
    from_env: bool,
  },
  Expired {
    expired_at: DateTime<Utc>,
  },
}

pub struct Session {
  store: Arc<dyn KeyValueStore>,
  /// Token supplied by the environment; never persisted or cleared.
  env_token: Option<String>,
  token: RwLock<Option<String>>,
}

impl Session {
  /// Load the session, picking up a previously stored token.
  pub fn load(store: Arc<dyn KeyValueStore>, env_token: Option<String>) -> Self {
    let stored = match store.get(TOKEN_KEY) {
      Ok(token) => token,
      Err(e) => {
        tracing::warn!(error = %e, "could not read stored session token");
        None
      }
    };

    Self {
      store,
      env_token: env_token.filter(|t| !t.trim().is_empty()),
      token: RwLock::new(stored),
    }
  }

  /// The bearer token to attach to an authenticated call.
  ///
  /// An expired stored token is cleared and reported as a missing credential.
  pub fn token(&self) -> Result<String, ApiError> {
    if let Some(token) = &self.env_token {
      return Ok(token.clone());
    }

    let token = self.stored().ok_or(ApiError::MissingCredential)?;

    if is_expired(&token, Utc::now()) {
      tracing::info!("stored session token has expired, clearing it");
      self.clear();
      return Err(ApiError::MissingCredential);
    }

    Ok(token)
  }

  /// Store the token returned by a login response.
  pub fn set_token(&self, token: &str) {
    if let Ok(mut guard) = self.token.write() {
      *guard = Some(token.to_string());
    }
    if let Err(e) = self.store.set(TOKEN_KEY, token) {
      tracing::warn!(error = %e, "could not persist session token");
    }
  }

  /// Whether a token set now is still there on the next run.
  pub fn persists(&self) -> bool {
    self.store.is_persistent()
  }

  /// Forget the stored token (logout).
  pub fn clear(&self) {
    if let Ok(mut guard) = self.token.write() {
      *guard = None;
    }
    if let Err(e) = self.store.remove(TOKEN_KEY) {
      tracing::warn!(error = %e, "could not remove session token");
    }
  }

  pub fn status(&self) -> SessionStatus {
    let (token, from_env) = match &self.env_token {
      Some(t) => (Some(t.clone()), true),
      None => (self.stored(), false),
    };

    let Some(token) = token else {
      return SessionStatus::LoggedOut;
    };

    match expires_at(&token) {
      Some(at) if at <= Utc::now() => SessionStatus::Expired { expired_at: at },
      expires_at => SessionStatus::Active {
        expires_at,
        from_env,
      },
    }
  }

  /// The persisted token, ignoring any environment override and expiry.
  pub fn stored(&self) -> Option<String> {
    self.token.read().ok().and_then(|guard| guard.clone())
  }
}

#[derive(Deserialize)]
struct Claims {
  exp: Option<i64>,
}

/// Decode the `exp` claim of a JWT-shaped token without verifying it.
///
/// Returns None for opaque tokens or tokens without an expiry.
pub fn expires_at(token: &str) -> Option<DateTime<Utc>> {
  let mut parts = token.split('.');
  let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
  if parts.next().is_some() {
    return None;
  }

  let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
  let claims: Claims = serde_json::from_slice(&bytes).ok()?;
  Utc.timestamp_opt(claims.exp?, 0).single()
}

fn is_expired(token: &str, now: DateTime<Utc>) -> bool {
  expires_at(token).is_some_and(|at| at <= now)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{MemoryStore, NoopStore, SqliteStore};

  /// Build an unsigned JWT-shaped token with the given expiry.
  fn jwt_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"u1","exp":{}}}"#, exp));
    format!("{}.{}.sig", header, payload)
  }

  fn session(store: Arc<MemoryStore>, env: Option<&str>) -> Session {
    Session::load(store, env.map(String::from))
  }

  #[test]
  fn test_expires_at_decodes_claim() {
    let token = jwt_with_exp(1_900_000_000);
    assert_eq!(
      expires_at(&token),
      Utc.timestamp_opt(1_900_000_000, 0).single()
    );
  }

  #[test]
  fn test_opaque_token_has_no_expiry() {
    assert_eq!(expires_at("abc123"), None);
    assert_eq!(expires_at("a.b.c.d"), None);
    assert_eq!(expires_at("a.!!!.c"), None);
  }

  #[test]
  fn test_no_token_is_missing_credential() {
    let s = session(Arc::new(MemoryStore::new()), None);
    assert_eq!(s.token(), Err(ApiError::MissingCredential));
    assert_eq!(s.status(), SessionStatus::LoggedOut);
  }

  #[test]
  fn test_set_token_persists_across_loads() {
    let store = Arc::new(MemoryStore::new());
    session(store.clone(), None).set_token("opaque-token");

    let reloaded = session(store, None);
    assert_eq!(reloaded.token().unwrap(), "opaque-token");
  }

  #[test]
  fn test_expired_token_is_cleared() {
    let store = Arc::new(MemoryStore::new());
    let s = session(store.clone(), None);
    s.set_token(&jwt_with_exp(1_000));

    assert!(matches!(s.status(), SessionStatus::Expired { .. }));
    assert_eq!(s.token(), Err(ApiError::MissingCredential));
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
  }

  #[test]
  fn test_noop_store_does_not_keep_token_across_runs() {
    let store: Arc<dyn KeyValueStore> = Arc::new(NoopStore);
    let s = Session::load(Arc::clone(&store), None);
    assert!(!s.persists());

    s.set_token("fresh");
    let next_run = Session::load(store, None);
    assert_eq!(next_run.token(), Err(ApiError::MissingCredential));
  }

  #[test]
  fn test_sqlite_store_persists_token() {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open(&dir.path().join("cache.db"), "scope").unwrap());
    let s = Session::load(store, None);
    assert!(s.persists());
  }

  #[test]
  fn test_env_token_wins_and_survives_logout() {
    let store = Arc::new(MemoryStore::new());
    let s = session(store, Some("from-env"));
    s.set_token("stored");
    s.clear();

    assert_eq!(s.token().unwrap(), "from-env");
    assert_eq!(
      s.status(),
      SessionStatus::Active {
        expires_at: None,
        from_env: true
      }
    );
  }
}
