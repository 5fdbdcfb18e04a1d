//! Records served by the console API.
//!
//! Fields the client does not interpret are kept in `extra` so a cached copy
//! round-trips everything the server sent.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Server-assigned id; some services use integers, others strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
  Int(i64),
  Text(String),
}

impl fmt::Display for RecordId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RecordId::Int(n) => write!(f, "{}", n),
      RecordId::Text(s) => f.write_str(s),
    }
  }
}

/// Data bucket in the bucket store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
  #[serde(alias = "_id")]
  pub id: RecordId,
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Application registered with the authentication service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
  #[serde(alias = "_id")]
  pub id: RecordId,
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub domain: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Marketplace listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
  #[serde(alias = "_id")]
  pub id: RecordId,
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub price: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Waitlist project collecting signups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitlistProject {
  #[serde(alias = "_id")]
  pub id: RecordId,
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub signups: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_at: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub updated_at: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

/// Columns shared by every record, for table output.
pub trait RecordSummary {
  fn summary_id(&self) -> String;
  fn summary_name(&self) -> &str;
  fn summary_updated(&self) -> Option<&str>;
  /// One resource-specific column
  fn summary_detail(&self) -> String;
}

macro_rules! impl_summary {
  ($ty:ty, |$r:ident| $detail:expr) => {
    impl RecordSummary for $ty {
      fn summary_id(&self) -> String {
        self.id.to_string()
      }

      fn summary_name(&self) -> &str {
        &self.name
      }

      fn summary_updated(&self) -> Option<&str> {
        self.updated_at.as_deref().or(self.created_at.as_deref())
      }

      fn summary_detail(&self) -> String {
        let $r = self;
        $detail
      }
    }
  };
}

impl_summary!(Bucket, |b| b.description.clone().unwrap_or_default());
impl_summary!(Application, |a| a.domain.clone().unwrap_or_default());
impl_summary!(Product, |p| match &p.price {
  Some(Value::String(s)) => s.clone(),
  Some(other) => other.to_string(),
  None => String::new(),
});
impl_summary!(WaitlistProject, |w| w
  .signups
  .map(|n| format!("{} signups", n))
  .unwrap_or_default());
