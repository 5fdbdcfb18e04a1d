//! Structured logging to stderr, optionally mirrored as JSON into a log file.

use chrono::Utc;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogConfig;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. The returned guard
/// flushes the file writer and must be held until the process exits.
pub fn init(config: &LogConfig, verbose: u8, log_dir: Option<&Path>) -> Option<WorkerGuard> {
  let level = match verbose {
    0 => config.level.clone(),
    1 => "info".to_string(),
    2 => "debug".to_string(),
    _ => "trace".to_string(),
  };
  let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

  let console = fmt::layer()
    .with_writer(std::io::stderr)
    .with_target(false)
    .with_filter(filter());

  let (file, guard) = match log_dir.filter(|_| config.file) {
    Some(dir) => {
      let name = format!("consolectl.{}.{}.log", Utc::now().format("%Y%m%d"), std::process::id());
      let appender = tracing_appender::rolling::never(dir, name);
      let (writer, guard) = tracing_appender::non_blocking(appender);
      let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .json()
        .with_filter(filter());
      (Some(layer), Some(guard))
    }
    None => (None, None),
  };

  // A subscriber may already be installed (tests); keep it rather than panic
  if tracing_subscriber::registry()
    .with(console)
    .with(file)
    .try_init()
    .is_err()
  {
    tracing::debug!("global tracing subscriber already initialized");
  }

  guard
}
