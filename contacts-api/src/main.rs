//! contacts-api - Contacts service entry point
//!
//! Startup order: configuration, tracing, record store, change channel,
//! change relay, HTTP server. Shutdown runs in reverse: the HTTP server
//! drains, the relay is cancelled and awaited, then the channel and the
//! record store are closed.

use anyhow::{Context, Result};
use clap::Parser;
use contacts_common::channel::{self, CONTACT_CHANGES};
use contacts_common::config::{CliOverrides, ConfigResolver};
use contacts_common::db::init_database;
use contacts_api::live::{ChangeRelay, SubscriberRegistry};
use contacts_api::{build_router, AppState};
use std::path::PathBuf;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for contacts-api
///
/// Every option falls back to its environment variable, then the TOML config
/// file, then a built-in default.
#[derive(Parser, Debug)]
#[command(name = "contacts-api")]
#[command(about = "Contacts service with versioned history and live updates")]
#[command(version)]
struct Args {
    /// Record store connection string (DATABASE_URL)
    #[arg(long)]
    database_url: Option<String>,

    /// Change channel connection string (CHANNEL_URL)
    #[arg(long)]
    channel_url: Option<String>,

    /// development, production or test (MODE)
    #[arg(long)]
    mode: Option<String>,

    /// Address to listen on (BIND_ADDR)
    #[arg(short, long = "bind")]
    bind_addr: Option<String>,

    /// Change relay poll interval in milliseconds (RELAY_POLL_INTERVAL_MS)
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Route prefix for the contacts API, e.g. /v2 (API_PREFIX)
    #[arg(long)]
    api_prefix: Option<String>,

    /// TOML config file (CONTACTS_CONFIG)
    #[arg(short, long = "config")]
    config_file: Option<PathBuf>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        CliOverrides {
            database_url: args.database_url,
            channel_url: args.channel_url,
            mode: args.mode,
            bind_addr: args.bind_addr,
            poll_interval_ms: args.poll_interval_ms,
            api_prefix: args.api_prefix,
            config_file: args.config_file,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = ConfigResolver::new(args.into())
        .resolve()
        .context("Failed to resolve configuration")?;

    // Initialize tracing; RUST_LOG wins over the mode default
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.mode.default_log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting contacts-api v{} [{}] built {} ({}) in {} mode",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
        config.mode
    );

    let pool = init_database(&config.database_url)
        .await
        .context("Failed to open record store")?;

    let change_channel = channel::connect(&config.channel_url, CONTACT_CHANGES)
        .await
        .context("Failed to connect change channel")?;

    let shutdown = CancellationToken::new();
    let registry = SubscriberRegistry::new();

    let relay = ChangeRelay::new(
        pool.clone(),
        change_channel.clone(),
        registry.clone(),
        config.poll_interval,
    )
    .spawn(shutdown.clone())
    .await
    .context("Failed to start change relay")?;

    let state = AppState::new(pool.clone(), change_channel.clone(), registry, shutdown.clone());
    let app = build_router(state, config.api_prefix.as_deref());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;
    info!("contacts-api listening on http://{}", config.bind_addr);

    let signal_token = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            signal_token.cancel();
        })
        .await;

    // Teardown runs even if the server failed
    relay.shutdown().await;
    change_channel.close().await;
    pool.close().await;

    served.context("Server error")?;
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
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
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
