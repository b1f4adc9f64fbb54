//! # Fleetbook API Main Entry Point
//!
//! This is the main entry point for the Fleetbook API service.

use std::sync::Arc;

use fleetbook::migration::{Migrator, MigratorTrait};
use fleetbook::sweeper::StatusSweeper;
use fleetbook::{config::ConfigLoader, db, server::run_server, telemetry};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration from layered env files and variables
    let config_loader = ConfigLoader::new();
    let config = Arc::new(config_loader.load()?);

    telemetry::init_tracing(&config)?;

    tracing::info!(profile = %config.profile, "Loaded configuration");
    if let Ok(redacted_json) = config.redacted_json() {
        tracing::debug!(config = %redacted_json, "Effective configuration");
    }

    let pool = db::init_pool(&config).await?;
    Migrator::up(&pool, None).await?;

    let shutdown = CancellationToken::new();

    let sweeper = StatusSweeper::new(Arc::clone(&config), Arc::new(pool.clone()));
    let sweeper_handle = tokio::spawn(sweeper.run(shutdown.child_token()));

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    let result = run_server(config, pool, shutdown.clone()).await;

    shutdown.cancel();
    let _ = sweeper_handle.await;

    result
}
