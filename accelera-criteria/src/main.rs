//! accelera-criteria - Criteria reconciliation service
//!
//! Loads bootstrap config, opens the local criteria cache, wires the feeds
//! into a shared store, keeps it fresh with a polling loop and serves the
//! scoped views over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use accelera_common::config::{resolve_config_path, TomlConfig};
use accelera_common::criteria::parse_raw_list;
use accelera_common::CriteriaStore;
use accelera_criteria::feeds::{CacheFeed, MemoryFeed, RemoteFeed};
use accelera_criteria::sync::{spawn_refresh_loop, CriteriaSync};
use accelera_criteria::{build_router, db, AppState};
use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Command-line arguments for accelera-criteria
#[derive(Parser, Debug)]
#[command(name = "accelera-criteria")]
#[command(about = "Criteria reconciliation service for Accelera")]
#[command(version)]
struct Args {
    /// Config file (defaults to the platform config location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long, env = "ACCELERA_PORT")]
    port: Option<u16>,

    /// Cache database path (overrides config)
    #[arg(short, long, env = "ACCELERA_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = match &config_path {
        Some(path) => TomlConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(database) = args.database {
        config.database_path = database;
    }

    // Initialize tracing subscriber (RUST_LOG wins over the config level)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!(
        "Starting Accelera criteria service v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => warn!("No config file found, using built-in defaults"),
    }

    let pool = match db::connect(&config.database_path).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open criteria cache database: {}", e);
            return Err(e.into());
        }
    };

    // Query order is cache, memory, remote: remote data overwrites local
    let store = Arc::new(CriteriaStore::new());
    let cache = CacheFeed::new(pool);
    let memory = MemoryFeed::new();
    if let Some(seed_file) = &config.seed_file {
        let json = std::fs::read_to_string(seed_file)
            .with_context(|| format!("Failed to read seed file {}", seed_file.display()))?;
        let records = parse_raw_list(&json)
            .with_context(|| format!("Seed file {} is not JSON", seed_file.display()))?;
        info!("Loaded {} seed criteria from {}", records.len(), seed_file.display());
        memory.extend(records);
    }

    let mut sync = CriteriaSync::new(Arc::clone(&store))
        .with_feed(Arc::new(cache.clone()))
        .with_feed(Arc::new(memory));
    match &config.remote.base_url {
        Some(base_url) => {
            let remote = RemoteFeed::new(base_url, config.remote.timeout())
                .context("Failed to configure remote criteria feed")?;
            info!("Remote criteria feed: {}", base_url);
            sync = sync.with_feed(Arc::new(remote));
        }
        None => info!("Remote criteria feed disabled (no remote.base_url)"),
    }
    let sync = Arc::new(sync);
    info!(
        "Criteria feeds (query order): {}",
        sync.sources()
            .iter()
            .map(|source| source.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let cancel = CancellationToken::new();
    let poller = match config.refresh_interval() {
        Some(period) => Some(spawn_refresh_loop(
            Arc::clone(&sync),
            config.watched_programs.clone(),
            period,
            cancel.clone(),
        )),
        None => {
            info!("Background refresh disabled; loading criteria once");
            sync.refresh(None).await;
            None
        }
    };

    let state = AppState::new(Arc::clone(&sync), cache);
    let app = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("accelera-criteria listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    // Stop the poller even if the server exited on its own
    cancel.cancel();
    if let Some(poller) = poller {
        if let Err(e) = poller.await {
            warn!("Refresh loop ended abnormally: {}", e);
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
