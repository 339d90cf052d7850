//! Schema reset command
//!
//! Usage: alifh-cli reset-schema --yes

use alifh_shared::db::maintenance::reset_schema;
use clap::Args;

#[derive(Debug, Args)]
pub struct ResetArgs {
    /// Confirm that every table and row will be destroyed
    #[arg(long)]
    pub yes: bool,
}

pub async fn execute(database_url: &str, args: ResetArgs) -> anyhow::Result<()> {
    if !args.yes {
        anyhow::bail!("reset-schema destroys all data; pass --yes to confirm");
    }

    let pool = super::connect(database_url).await?;

    reset_schema(&pool).await?;
    println!("✓ Schema dropped, recreated and migrated");

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_refuses_without_confirmation() {
        let err = execute("postgresql://localhost:1/none", ResetArgs { yes: false })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--yes"));
    }
}
