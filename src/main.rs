mod app;
mod budget;
mod cache;
mod commands;
mod config;
mod db;
mod lifecycle;
mod net;
mod notify;
mod router;
mod store;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "spendcache")]
#[command(about = "Offline-first budget tracker with a versioned asset cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/spendcache/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: commands::Command,
}

/// Log to a daily file under the data directory so stdout stays clean.
/// Use RUST_LOG to control the level (e.g., RUST_LOG=spendcache=debug).
fn init_tracing() -> Result<WorkerGuard> {
  let log_dir = db::data_dir()?.join("logs");
  std::fs::create_dir_all(&log_dir)?;

  let (writer, guard) =
    tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "spendcache.log"));
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

  tracing_subscriber::registry()
    .with(fmt::layer().with_writer(writer).with_ansi(false))
    .with(filter)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let _guard = init_tracing()?;

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;
  info!(origin = %config.origin, version = %config.cache.version, "starting");

  let app = app::App::new(config)?;
  app.run(args.command).await?;

  Ok(())
}
