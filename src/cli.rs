use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};
use serde_json::{Map, Value};
use std::path::PathBuf;

use crate::error::ApiError;

#[derive(Parser, Debug)]
#[command(name = "consolectl")]
#[command(about = "Manage buckets, apps, marketplace listings and waitlists from the terminal")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/consolectl/config.yaml)
  #[arg(short, long, global = true)]
  pub config: Option<PathBuf>,

  /// Increase log verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = ArgAction::Count, global = true)]
  pub verbose: u8,

  /// Print raw JSON instead of tables
  #[arg(long, global = true)]
  pub json: bool,

  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Log in and remember the session token
  Login {
    #[arg(long)]
    email: String,
    #[arg(long, env = "CONSOLECTL_PASSWORD", hide_env_values = true)]
    password: String,
  },
  /// Forget the session token
  Logout,
  /// Show the account behind the current token
  Whoami,
  /// Show whether a session is active and when it expires
  Status,
  /// List a resource (served from cache unless --refresh)
  List {
    resource: String,
    /// Ignore the cache and fetch from the server
    #[arg(long)]
    refresh: bool,
  },
  /// Show one record
  Get { resource: String, id: String },
  /// Create a record
  Create {
    resource: String,
    #[command(flatten)]
    fields: FieldArgs,
  },
  /// Update a record
  Update {
    resource: String,
    id: String,
    #[command(flatten)]
    fields: FieldArgs,
  },
  /// Delete a record
  Delete { resource: String, id: String },
  /// Add a JSON document to a bucket
  PutData {
    bucket_id: String,
    /// JSON document, e.g. '{"score": 3}'
    document: String,
  },
  /// Refresh every cached list
  Sync,
  /// Show resource names and their aliases
  Resources,
  /// Manage the local response cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
  /// Drop all cached responses for the configured API
  Clear,
}

/// Attributes for create/update.
#[derive(ClapArgs, Debug, Default)]
pub struct FieldArgs {
  /// Record name
  #[arg(long)]
  pub name: Option<String>,

  /// Set an attribute; VALUE is parsed as JSON when possible, else kept as text
  #[arg(long = "set", value_name = "KEY=VALUE")]
  pub set: Vec<String>,

  /// Full JSON object of attributes; --name and --set are applied on top
  #[arg(long)]
  pub data: Option<String>,
}

impl FieldArgs {
  /// Build the JSON request body.
  pub fn into_body(self) -> Result<Value, ApiError> {
    let mut body = match self.data.as_deref() {
      Some(raw) => match serde_json::from_str(raw).map_err(ApiError::parse)? {
        Value::Object(map) => map,
        _ => {
          return Err(ApiError::Parse {
            message: "--data must be a JSON object".to_string(),
          })
        }
      },
      None => Map::new(),
    };

    if let Some(name) = self.name {
      body.insert("name".to_string(), Value::String(name));
    }

    for pair in &self.set {
      let (key, raw) = pair.split_once('=').ok_or_else(|| ApiError::Parse {
        message: format!("expected KEY=VALUE, got '{}'", pair),
      })?;
      let key = key.trim();
      if key.is_empty() {
        return Err(ApiError::Parse {
          message: format!("empty attribute name in '{}'", pair),
        });
      }
      let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
      body.insert(key.to_string(), value);
    }

    Ok(Value::Object(body))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_list_with_refresh() {
    let args = Args::try_parse_from(["consolectl", "list", "buckets", "--refresh", "--json"]).unwrap();
    assert!(args.json);
    assert!(matches!(
      args.command,
      Command::List { ref resource, refresh: true } if resource == "buckets"
    ));
  }

  #[test]
  fn test_parse_update_fields() {
    let args = Args::try_parse_from([
      "consolectl",
      "update",
      "apps",
      "7",
      "--name",
      "B",
      "--set",
      "public=true",
    ])
    .unwrap();

    let Command::Update { id, fields, .. } = args.command else {
      panic!("expected update");
    };
    assert_eq!(id, "7");
    assert_eq!(
      fields.into_body().unwrap(),
      json!({ "name": "B", "public": true })
    );
  }

  #[test]
  fn test_set_values_fall_back_to_text() {
    let fields = FieldArgs {
      set: vec!["region=eu-west".into(), "limit=10".into(), "note=a=b".into()],
      ..Default::default()
    };
    assert_eq!(
      fields.into_body().unwrap(),
      json!({ "region": "eu-west", "limit": 10, "note": "a=b" })
    );
  }

  #[test]
  fn test_data_is_merged_under_flags() {
    let fields = FieldArgs {
      name: Some("override".into()),
      data: Some(r#"{"name": "orig", "price": 5}"#.into()),
      ..Default::default()
    };
    assert_eq!(
      fields.into_body().unwrap(),
      json!({ "name": "override", "price": 5 })
    );
  }

  #[test]
  fn test_malformed_data_is_parse_error() {
    let bad_json = FieldArgs {
      data: Some("{nope".into()),
      ..Default::default()
    };
    assert!(matches!(bad_json.into_body(), Err(ApiError::Parse { .. })));

    let not_object = FieldArgs {
      data: Some("[1]".into()),
      ..Default::default()
    };
    assert!(matches!(not_object.into_body(), Err(ApiError::Parse { .. })));

    let bad_pair = FieldArgs {
      set: vec!["novalue".into()],
      ..Default::default()
    };
    assert!(matches!(bad_pair.into_body(), Err(ApiError::Parse { .. })));
  }

  #[test]
  fn test_password_flag_required_without_env() {
    // Only meaningful when the variable is not set in the test environment
    if std::env::var("CONSOLECTL_PASSWORD").is_err() {
      assert!(Args::try_parse_from(["consolectl", "login", "--email", "a@b.c"]).is_err());
    }
  }
}
