//! ech-dash - ECH survey dashboard server
//!
//! Serves the dashboard UI and its session API. Survey files are read from
//! the data folder resolved from CLI, environment, config file or the OS
//! default, in that order.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use ech_common::config::{resolve_data_folder, TomlConfig, DATA_FOLDER_ENV};
use ech_dash::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for ech-dash
#[derive(Parser, Debug)]
#[command(name = "ech-dash")]
#[command(about = "Weighted summaries of the Encuesta Continua de Hogares")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "ECH_PORT")]
    port: Option<u16>,

    /// Folder containing ech_<year>.csv files
    #[arg(short, long)]
    data_folder: Option<PathBuf>,

    /// Path to the TOML config file
    #[arg(short, long, env = "ECH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Parse errors are fatal; a missing file just means defaults
    let config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("ech_dash={},tower_http={}", config.logging.level, config.logging.level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting ECH dashboard (ech-dash) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let data_folder = resolve_data_folder(args.data_folder.as_deref(), DATA_FOLDER_ENV, &config);
    if data_folder.is_dir() {
        info!("Data folder: {}", data_folder.display());
    } else {
        warn!(
            "Data folder {} does not exist; no survey years will be offered",
            data_folder.display()
        );
    }

    let state = AppState::new(data_folder);
    if state.strict_controls {
        info!("Strict control validation enabled (debug build)");
    }

    // Sweep idle sessions
    let idle_timeout = Duration::from_secs(config.session_idle_timeout_secs);
    let registry = state.registry.clone();
    tokio::spawn(async move {
        let period = idle_timeout.clamp(Duration::from_secs(1), Duration::from_secs(60));
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = registry.sweep_idle(idle_timeout).await;
            if removed > 0 {
                info!("Swept {} idle session(s)", removed);
            }
        }
    });

    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr: SocketAddr = format!("{}:{}", config.host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.host, port))?;

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return Err(e.into());
        }
    };
    info!("ech-dash listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

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
