//! Contest Grader - Worker Entry Point
//!
//! Consumes the judge and finalize queues and runs the grading pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use redis::Client as RedisClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use contest_grader::{config::Config, db, state::AppState, worker::Worker};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Initialize tracing
    let json_logs = config.server.json_logs;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.rust_log.clone().into()),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    tracing::info!("Starting contest grader...");

    let db_pool = db::connect(&config.database).await?;

    tracing::info!("Running database migrations...");
    db::run_migrations(&db_pool).await?;

    tracing::info!("Connecting to Redis...");
    let redis_client = RedisClient::open(config.redis.url.as_str())?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client).await?;

    let state = AppState::new(db_pool, redis_conn, config)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = shutdown.clone();
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
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

        tracing::info!("Shutdown signal received");
        shutdown_flag.store(true, Ordering::SeqCst);
    });

    let mut worker = Worker::new(
        state.redis(),
        state.submissions(),
        state.ratings(),
        state.config().worker.clone(),
        shutdown,
    );
    worker.run().await?;

    tracing::info!("Contest grader shutdown complete");
    Ok(())
}
