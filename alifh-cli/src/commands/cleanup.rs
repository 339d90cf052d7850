//! Expired auth record cleanup
//!
//! Usage: alifh-cli cleanup

use alifh_shared::db::maintenance::cleanup_expired;

pub async fn execute(database_url: &str) -> anyhow::Result<()> {
    let pool = super::connect(database_url).await?;

    let report = cleanup_expired(&pool).await?;
    println!(
        "✓ Removed {} expired sessions and {} magic-link records",
        report.sessions, report.verifications
    );

    pool.close().await;
    Ok(())
}
