//! Database layer for the marketplace.
//!
//! - `pool`: PostgreSQL connection pool with a startup health check
//! - `migrations`: Embedded schema migrations
//! - `maintenance`: Table inspection, schema reset and expiry cleanup used by the CLI
//!
//! ```no_run
//! use alifh_shared::db::pool::{create_pool, DatabaseConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = create_pool(DatabaseConfig::from_url(std::env::var("DATABASE_URL")?)).await?;
//! alifh_shared::db::migrations::run_migrations(&pool).await?;
//! # Ok(())
//! # }
//! ```

pub mod maintenance;
pub mod migrations;
pub mod pool;
