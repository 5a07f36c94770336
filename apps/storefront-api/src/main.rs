//! # Stride Storefront API
//!
//! Binary entry point: logging, configuration, database, admin bootstrap,
//! then serve until Ctrl+C / SIGTERM.

use std::time::Duration;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use storefront_api::config::AppConfig;
use storefront_api::{app_state, build_router};
use stride_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env first so RUST_LOG from it applies too
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,stride=debug,storefront_api=debug")),
        )
        .with_target(true)
        .init();

    info!("Starting Stride storefront API...");

    let config = AppConfig::load().context("loading configuration")?;
    info!(
        address = %config.bind_address(),
        database = %config.database_path,
        dev_secret = config.uses_dev_secret(),
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(&config.database_path)
            .max_connections(config.db_max_connections)
            .connect_timeout(Duration::from_secs(5)),
    )
    .await
    .context("opening database")?;
    info!("Database ready");

    let address = config.bind_address();
    let state = app_state(db.clone(), config)
        .await
        .context("bootstrapping admin account")?;

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {}", address))?;
    info!(%address, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
