//! Database module
//!
//! This module handles the connection pool, migrations, the [`Store`] seam
//! and its PostgreSQL and in-memory implementations.

pub mod memory;
pub mod postgres;
pub mod repositories;
pub mod store;

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{config::DatabaseConfig, error::AppResult};

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::Store;

/// Open the pool and make sure the database answers
pub async fn connect(config: &DatabaseConfig) -> AppResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!(max_connections = config.max_connections, "Database pool ready");

    Ok(pool)
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
