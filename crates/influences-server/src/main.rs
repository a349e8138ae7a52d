//! influences-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus
//! `INFLUENCES_*` environment overrides, opens the SQLite store, seeds the
//! activity feed from it, and serves the API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use influences_hub::ActivityHub;
use influences_osu::{OsuApi, Requester};
use influences_server::{AppState, config};
use influences_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Mapper influences backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = config::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let hub = ActivityHub::seeded(server_cfg.activity_capacity, &store)
    .await
    .context("failed to load recent activity")?;

  let requester = Arc::new(
    Requester::new(server_cfg.osu.requester_config()).context("failed to build osu! client")?,
  );
  let osu = OsuApi::new(
    requester.clone(),
    &server_cfg.osu.api_base_url,
    server_cfg.osu.cache_config(),
  );

  let state = AppState {
    store:  Arc::new(store),
    hub:    Arc::new(hub),
    osu:    Arc::new(osu),
    config: Arc::new(server_cfg.clone()),
  };

  let app = influences_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  requester.close();
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!("failed to listen for shutdown signal: {e}");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutting down");
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
