use std::time::Duration;

use anyhow::Result;
use blogcms_api::{
    app::{router, AppState, Stores},
    config::Config,
    jobs::{JobScheduler, KeepAliveJob, PoolMetricsJob},
    middleware::{init_metrics, logging::init_logging},
};
use domain::models::PingType;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging);
    init_metrics()?;

    info!("Starting blog settings API v{}", env!("CARGO_PKG_VERSION"));

    let pool = persistence::db::create_pool(&config.database).await?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let addr = config.socket_addr()?;
    let keep_alive_enabled = config.keep_alive.enabled;
    let state = AppState::new(config, Stores::postgres(pool.clone()));

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool));
    if keep_alive_enabled {
        scheduler.register(KeepAliveJob::new(state.keep_alive.clone()));
        state.keep_alive.set_running(true);
    }
    scheduler.start();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on {}", addr);

    if keep_alive_enabled {
        let monitor = state.keep_alive.clone();
        tokio::spawn(async move {
            if let Err(e) = monitor.ping(PingType::Initial).await {
                warn!(error = %e, "Failed to record initial keep-alive ping");
            }
        });
    }

    axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, shutting down background jobs");
    state.keep_alive.set_running(false);
    scheduler.shutdown();
    scheduler.wait_for_shutdown(Duration::from_secs(10)).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
