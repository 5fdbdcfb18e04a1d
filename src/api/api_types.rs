//! Response envelopes of the console API.
//!
//! Every resource comes wrapped under a named field (`{ "bucket": {...} }`,
//! `{ "products": [...] }`); these helpers peel that layer off.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Take `field` out of a response object and deserialize it.
///
/// A body that is not an object carrying `field` is deserialized as-is, so
/// endpoints returning a bare array or record are accepted too.
pub fn unwrap_envelope<T: DeserializeOwned>(body: Value, field: &str) -> Result<T, ApiError> {
  let inner = match body {
    Value::Object(mut map) if map.contains_key(field) => map.remove(field).unwrap_or(Value::Null),
    other => other,
  };
  serde_json::from_value(inner).map_err(ApiError::parse)
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `message`, then `error` (either a string or `{ message }`).
pub fn error_message(body: &Value) -> Option<String> {
  let non_empty = |v: &Value| v.as_str().filter(|s| !s.trim().is_empty()).map(String::from);

  if let Some(message) = body.get("message").and_then(non_empty) {
    return Some(message);
  }

  let error = body.get("error")?;
  match error {
    Value::Object(_) => error.get("message").and_then(non_empty),
    other => non_empty(other),
  }
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
  #[serde(alias = "accessToken", alias = "access_token")]
  pub token: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CurrentUser {
  #[serde(default)]
  pub id: Value,
  #[serde(default)]
  pub email: Option<String>,
  #[serde(default)]
  pub name: Option<String>,
}
