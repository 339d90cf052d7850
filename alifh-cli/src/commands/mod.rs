//! Command implementations

pub mod cleanup;
pub mod inspect;
pub mod migrate;
pub mod reset;
pub mod roles;
pub mod seed;

use alifh_shared::db::pool::{create_pool, DatabaseConfig};
use sqlx::PgPool;
use tracing::debug;

/// Small pool for one-shot commands
pub async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = create_pool(DatabaseConfig {
        max_connections: 2,
        min_connections: 0,
        acquire_timeout_seconds: 10,
        ..DatabaseConfig::from_url(database_url)
    })
    .await?;
    debug!("Connected to database");

    Ok(pool)
}
