mod api;
mod app;
mod cache;
mod cli;
mod config;
mod connectivity;
mod data;
mod db;
mod error;
mod render;
mod resource;
mod search;
mod session;
mod store;
mod validation;

use clap::Parser;
use color_eyre::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::error::ClientError;

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let cli = cli::Cli::parse();

  let log_guard = init_logging(&db::Database::data_dir()?.join("logs"));

  // Load configuration
  let config = config::Config::load(cli.config.as_deref())?;

  let db = Arc::new(db::Database::open_default()?);
  let app = app::App::new(config, db, cli.api_url)?;

  let result = app.run(cli.command).await;
  let failure = result
    .as_ref()
    .err()
    .and_then(|e| e.downcast_ref::<ClientError>())
    .and_then(user_facing);

  if let Some((message, code)) = failure {
    eprintln!("{}", message);
    // Flush pending log lines before exiting
    drop(log_guard);
    std::process::exit(code);
  }
  result
}

/// Short message and exit code for errors the user can act on directly.
fn user_facing(error: &ClientError) -> Option<(String, i32)> {
  match error {
    ClientError::NotLoggedIn => Some(("not logged in: fintrackr login <username>".to_string(), 1)),
    ClientError::Auth(_) => Some((
      "session expired, log in again: fintrackr login <username>".to_string(),
      1,
    )),
    ClientError::Validation { field, message } => Some((format!("{}: {}", field, message), 2)),
    _ => None,
  }
}

/// Log to a daily rolling file so stdout carries only command output.
///
/// Filter from FINTRACKR_LOG, default `fintrackr=info`.
fn init_logging(log_dir: &Path) -> WorkerGuard {
  let file_appender = tracing_appender::rolling::daily(log_dir, "fintrackr.log");
  let (writer, guard) = tracing_appender::non_blocking(file_appender);

  let filter =
    EnvFilter::try_from_env("FINTRACKR_LOG").unwrap_or_else(|_| EnvFilter::new("fintrackr=info"));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  guard
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_login_is_not_reported_as_expired() {
    let (message, code) = user_facing(&ClientError::NotLoggedIn).unwrap();
    assert_eq!(message, "not logged in: fintrackr login <username>");
    assert_eq!(code, 1);

    let (message, _) = user_facing(&ClientError::Auth("Token expired".to_string())).unwrap();
    assert!(message.starts_with("session expired"));
  }

  #[test]
  fn test_validation_exits_with_usage_code() {
    let (message, code) = user_facing(&ClientError::validation("amount", "must be greater than 0")).unwrap();
    assert_eq!(message, "amount: must be greater than 0");
    assert_eq!(code, 2);
    assert_eq!(user_facing(&ClientError::Network("refused".to_string())), None);
  }
}
