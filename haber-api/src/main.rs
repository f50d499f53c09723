//! haber-api - Main entry point
//!
//! Serves the news stance classifier over HTTP. Startup order:
//! configuration, logging, database (with schema sync), model, router.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use haber_api::classifier::load_model;
use haber_api::{build_router, AppState, PasswordHasher};
use haber_common::config::load_config;
use haber_common::db::init_database;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for haber-api
#[derive(Parser, Debug)]
#[command(name = "haber-api")]
#[command(about = "Turkish news stance classification API")]
#[command(version)]
struct Args {
    /// Config file (overrides HABER_CONFIG and discovered files)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "HABER_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "HABER_PORT")]
    port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, env = "HABER_DATABASE")]
    database: Option<PathBuf>,

    /// Trained pipeline artifact
    #[arg(short, long, env = "HABER_MODEL")]
    model: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref()).context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting haber-api v{}", env!("CARGO_PKG_VERSION"));

    let mut server = config.server;
    if let Some(host) = args.host {
        server.host = host;
    }
    if let Some(port) = args.port {
        server.port = port;
    }
    if let Some(path) = args.database {
        server.database_path = path;
    }
    if let Some(path) = args.model {
        server.model_path = path;
    }

    let pool = init_database(&server.database_path)
        .await
        .with_context(|| format!("Failed to open database {}", server.database_path.display()))?;

    let model = load_model(&server.model_path);
    let hasher = PasswordHasher::new(server.password_iterations);

    let state = AppState::new(pool, model, hasher);
    let app = build_router(state);

    let addr = server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("haber-api listening on http://{}", addr);
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
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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
