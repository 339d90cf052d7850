//! Migration command
//!
//! Usage: alifh-cli migrate [--status] [--create-database]

use alifh_shared::db::migrations::{ensure_database_exists, get_migration_status, run_migrations};
use clap::Args;

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Print applied/known migrations without changing anything
    #[arg(long)]
    pub status: bool,

    /// Create the database first if it does not exist
    #[arg(long)]
    pub create_database: bool,
}

pub async fn execute(database_url: &str, args: MigrateArgs) -> anyhow::Result<()> {
    if args.create_database {
        ensure_database_exists(database_url).await?;
    }

    let pool = super::connect(database_url).await?;

    if !args.status {
        run_migrations(&pool).await?;
        println!("✓ Migrations applied");
    }

    let status = get_migration_status(&pool).await?;
    println!(
        "Applied {}/{} migrations (latest: {})",
        status.applied_migrations,
        status.known_migrations,
        status
            .latest_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    if !status.is_up_to_date {
        println!("Pending migrations remain; run `alifh-cli migrate`");
    }

    pool.close().await;
    Ok(())
}
