mod api;
mod cli;
mod commands;
mod config;
mod console;
mod error;
mod logging;
mod query;
mod render;
mod repository;
mod session;
mod store;
mod view;

use clap::Parser;
use color_eyre::{eyre::eyre, Result};

use cli::{Args, CacheAction, Command};
use commands::ResourceKind;
use console::ConsoleClient;
use session::SessionStatus;
use view::{run_query, ResourceOp, ResourceView};

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  let log_dir = config::Config::data_dir().map(|d| d.join("log"));
  if config.log.file {
    if let Some(dir) = &log_dir {
      std::fs::create_dir_all(dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
    }
  }
  let _log_guard = logging::init(&config.log, args.verbose, log_dir.as_deref());

  let console = ConsoleClient::new(&config)?;
  let output = execute(&console, args.command, args.json).await?;

  if !output.is_empty() {
    println!("{}", output.trim_end());
  }

  Ok(())
}

async fn execute(console: &ConsoleClient, command: Command, json: bool) -> Result<String> {
  match command {
    Command::Login { email, password } => {
      let api = console.api().clone();
      run_query(move || {
        let api = api.clone();
        let email = email.clone();
        let password = password.clone();
        async move { api.login(&email, &password).await.map_err(|e| e.to_string()) }
      })
      .await?;

      if console.api().session().persists() {
        return Ok("Logged in".to_string());
      }
      tracing::warn!("cache backend does not persist, session token kept for this run only");
      Ok(
        "Logged in for this run only: the configured cache backend does not keep the session. \
         Set cache.backend to sqlite or export CONSOLECTL_TOKEN."
          .to_string(),
      )
    }
    Command::Logout => {
      console.api().logout();
      Ok("Logged out".to_string())
    }
    Command::Whoami => {
      let api = console.api().clone();
      let user = run_query(move || {
        let api = api.clone();
        async move { api.me().await.map_err(|e| e.to_string()) }
      })
      .await?;

      if json {
        return Ok(render::json(&user));
      }
      let label = user
        .email
        .or(user.name)
        .unwrap_or_else(|| user.id.to_string());
      Ok(format!("Logged in as {}", label))
    }
    Command::Status => Ok(describe_status(console.api().session().status())),
    Command::List { resource, refresh } => {
      run_resource(console, &resource, ResourceOp::List { refresh }, json).await
    }
    Command::Get { resource, id } => {
      run_resource(console, &resource, ResourceOp::Get { id }, json).await
    }
    Command::Create { resource, fields } => {
      let body = fields.into_body()?;
      run_resource(console, &resource, ResourceOp::Create { body }, json).await
    }
    Command::Update {
      resource,
      id,
      fields,
    } => {
      let body = fields.into_body()?;
      if body.as_object().is_some_and(|m| m.is_empty()) {
        return Err(eyre!("Nothing to update. Pass --name, --set or --data."));
      }
      run_resource(console, &resource, ResourceOp::Update { id, body }, json).await
    }
    Command::Delete { resource, id } => {
      run_resource(console, &resource, ResourceOp::Delete { id }, json).await
    }
    Command::PutData {
      bucket_id,
      document,
    } => {
      let client = console.clone();
      let stored = run_query(move || {
        let client = client.clone();
        let bucket_id = bucket_id.clone();
        let document = document.clone();
        async move {
          client
            .put_bucket_data(&bucket_id, &document)
            .await
            .map_err(|e| e.to_string())
        }
      })
      .await?;
      Ok(render::json(&stored))
    }
    Command::Resources => Ok(
      commands::get_suggestions("")
        .iter()
        .map(|r| format!("{:<10} {:<40} {}", r.name, r.aliases.join(", "), r.description))
        .collect::<Vec<_>>()
        .join("\n"),
    ),
    Command::Sync => {
      let outcomes = console.sync().await;
      let lines: Vec<String> = outcomes
        .iter()
        .map(|o| match &o.result {
          Ok(count) => format!("{:<18} {} refreshed", o.resource, count),
          Err(e) => format!("{:<18} failed: {}", o.resource, e),
        })
        .collect();

      if outcomes.iter().all(|o| o.result.is_err()) {
        return Err(eyre!("Sync failed:\n{}", lines.join("\n")));
      }
      Ok(lines.join("\n"))
    }
    Command::Cache {
      action: CacheAction::Clear,
    } => {
      let removed = console
        .clear_cache()
        .map_err(|e| eyre!("Failed to clear cache: {}", e))?;
      Ok(format!("Removed {} cached entries", removed))
    }
  }
}

async fn run_resource(
  console: &ConsoleClient,
  resource: &str,
  op: ResourceOp,
  json: bool,
) -> Result<String> {
  let kind = match op {
    ResourceOp::Update { .. } | ResourceOp::Delete { .. } => commands::resolve_exact(resource),
    _ => commands::resolve(resource),
  }
  .map_err(|e| eyre!(e))?;
  tracing::debug!(?kind, ?op, "running resource command");

  match kind {
    ResourceKind::Buckets => ResourceView::new(console.buckets.clone(), json).run(op).await,
    ResourceKind::Apps => ResourceView::new(console.apps.clone(), json).run(op).await,
    ResourceKind::Products => ResourceView::new(console.products.clone(), json).run(op).await,
    ResourceKind::Waitlists => ResourceView::new(console.waitlists.clone(), json).run(op).await,
  }
}

fn describe_status(status: SessionStatus) -> String {
  match status {
    SessionStatus::LoggedOut => "Not logged in".to_string(),
    SessionStatus::Active {
      expires_at,
      from_env,
    } => {
      let origin = if from_env { " (from CONSOLECTL_TOKEN)" } else { "" };
      match expires_at {
        Some(at) => format!("Logged in{}, token expires {}", origin, at.to_rfc3339()),
        None => format!("Logged in{}", origin),
      }
    }
    SessionStatus::Expired { expired_at } => format!(
      "Session expired at {}. Run `consolectl login` again.",
      expired_at.to_rfc3339()
    ),
  }
}
