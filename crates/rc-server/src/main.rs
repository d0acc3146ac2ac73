//! relaycast server
//!
//! Serves the pairing and broadcast UI, the HTTP API, and the live session
//! log streams.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rc_core::config::{self, ServerConfig};
use rc_server::bridge::BridgeConnector;
use rc_server::http::build_router;
use rc_server::session::run_retention;
use rc_server::AppState;

#[derive(Parser)]
#[command(name = "relaycast")]
#[command(about = "WhatsApp pairing and broadcast server")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind address (overrides config)
    #[arg(short, long)]
    bind: Option<String>,

    /// Port to listen on when --bind is not given
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Directory holding per-session credentials (overrides config)
    #[arg(long)]
    sessions_dir: Option<PathBuf>,

    /// Base URL of the messaging bridge (overrides config)
    #[arg(long)]
    bridge_url: Option<String>,

    /// Run in foreground with verbose output
    #[arg(short, long)]
    foreground: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.foreground { "debug" } else { &args.log_level };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("relaycast starting...");

    let mut config = if let Some(config_path) = &args.config {
        config::load_config(config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        let default_path = config::default_config_path();
        if default_path.exists() {
            config::load_config(&default_path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {:?}: {}", default_path, e);
                ServerConfig::default()
            })
        } else {
            tracing::info!("Using default configuration");
            ServerConfig::default()
        }
    };

    // Command line wins over the file
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    } else if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(dir) = args.sessions_dir {
        config.sessions_dir = dir;
    }
    if let Some(url) = args.bridge_url {
        config.bridge.url = url;
    }

    tokio::fs::create_dir_all(&config.sessions_dir)
        .await
        .with_context(|| format!("Failed to create sessions dir {:?}", config.sessions_dir))?;

    let connector = BridgeConnector::new(&config.bridge).context("Failed to create bridge client")?;
    tracing::info!("Using messaging bridge at {}", config.bridge.url);

    let bind_addr = config.bind_address.clone();
    let state = Arc::new(AppState::new(config, Arc::new(connector)));

    // Cancelling this also ends open log streams, so graceful shutdown can finish
    let cancel = state.shutdown.clone();

    // Setup signal handlers
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating shutdown...");
            }
            _ = terminate => {
                tracing::info!("Received SIGTERM, initiating shutdown...");
            }
        }

        cancel_clone.cancel();
    });

    tokio::spawn(run_retention(Arc::clone(&state), cancel.clone()));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", bind_addr))?;
    tracing::info!("Server running on {}", bind_addr);

    let shutdown = cancel.clone();
    axum::serve(listener, build_router(Arc::clone(&state)))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")?;

    tracing::info!("relaycast shutdown complete");
    Ok(())
}
