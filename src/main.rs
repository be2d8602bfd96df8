use std::time::Duration;

use kitnet_core::config::AppConfig;
use kitnet_core::repository::pg::PgStore;
use kitnet_core::services::maintenance_worker::{self, MaintenanceWorker};
use kitnet_core::services::{LeaseService, PaymentService};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = AppConfig::from_env();
    tracing::info!(environment = %config.environment, "starting kitnet-core");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .max_lifetime(Duration::from_secs(config.db_max_lifetime_seconds))
        .connect(&config.database_url)
        .await?;
    let store = PgStore::new(pool.clone());

    // Constructed so an HTTP layer could be wired in above this bring-up
    // by composing these services before building a router.
    let _lease_service = LeaseService::new(store.clone());
    let _payment_service = PaymentService::new(store.clone());

    let (worker_handle, stop_rx) = maintenance_worker::channel();
    let worker_cancel = CancellationToken::new();
    let worker_task = if config.scheduler_enabled {
        let worker = MaintenanceWorker::new(store, config.scheduler_interval_hours, stop_rx, worker_cancel.clone());
        tracing::info!(
            interval_hours = config.scheduler_interval_hours,
            "maintenance worker enabled"
        );
        Some(tokio::spawn(worker.run()))
    } else {
        tracing::warn!("maintenance worker disabled");
        None
    };

    shutdown_signal().await;
    worker_handle.stop();
    worker_cancel.cancel();
    if let Some(task) = worker_task {
        let _ = task.await;
    }

    pool.close().await;
    tracing::info!("kitnet-core shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
    }
    tracing::info!("shutdown signal received, waiting for the current maintenance pass to finish");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
