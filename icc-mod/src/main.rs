//! icc-mod - ICC moderation service
//!
//! Serves the moderation HTTP API over the ICC SQLite store. Settings
//! resolve as command line > environment > config file > defaults.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use icc_common::config::{load_file_config, ConfigOverrides, ServiceConfig};
use icc_common::db::init::init_database;
use icc_mod::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for icc-mod
#[derive(Parser, Debug)]
#[command(name = "icc-mod")]
#[command(about = "Moderation service for the ICC community")]
#[command(version)]
struct Args {
    /// Config file (default: ~/.config/icc/moderation.toml, then /etc/icc/moderation.toml)
    #[arg(short, long, env = "ICC_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file
    #[arg(short, long, env = "ICC_DATABASE")]
    database: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "ICC_BIND")]
    bind: Option<String>,

    /// Static admin key accepted in `x-admin-key`
    #[arg(long, env = "ICC_ADMIN_PANEL_KEY", hide_env_values = true)]
    admin_key: Option<String>,

    /// Trust `x-admin-user-id` / `x-admin-role` from an upstream gateway
    #[arg(long, env = "ICC_TRUST_GATEWAY_HEADERS")]
    trust_gateway_headers: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "icc_mod=info,icc_common=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!(
        "Starting ICC moderation service (icc-mod) v{}",
        env!("CARGO_PKG_VERSION")
    );

    let file_config =
        load_file_config(args.config.as_deref()).context("Failed to load config file")?;
    let config = ServiceConfig::resolve(
        ConfigOverrides {
            database_path: args.database,
            bind_address: args.bind,
            admin_key: args.admin_key,
            trust_gateway_headers: args.trust_gateway_headers,
        },
        file_config,
    )
    .context("Invalid configuration")?;

    info!("Database path: {}", config.database_path.display());
    let pool = init_database(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    match (&config.admin_key, config.trust_gateway_headers) {
        (None, false) => warn!("No admin key and gateway headers untrusted: admin API is unreachable"),
        (Some(_), _) => info!("Admin key authentication enabled"),
        (None, true) => info!("Gateway header authentication only"),
    }

    let state = AppState::new(
        pool,
        config.admin_key.as_deref(),
        config.trust_gateway_headers,
    );
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .context("Failed to bind to address")?;
    info!("icc-mod listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

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
            warn!("Failed to install Ctrl+C handler: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
