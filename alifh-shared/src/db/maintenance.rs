/// Maintenance operations backing the `alifh-cli` commands
///
/// These run raw SQL against the configured database: listing tables with
/// their row counts, describing a table's columns, dropping and recreating
/// the `public` schema, and purging expired sessions and magic-link records.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, warn};

use super::migrations::run_migrations;
use crate::models::{session::Session, verification::Verification};

#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    /// Table name is not present in the public schema
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// One row of `inspect-tables`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TableSummary {
    pub name: String,
    pub row_count: i64,
}

/// One column of a described table
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ColumnInfo {
    pub column_name: String,
    pub data_type: String,
    pub is_nullable: String,
    pub column_default: Option<String>,
}

/// Rows removed by [`cleanup_expired`]
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct CleanupReport {
    pub sessions: u64,
    pub verifications: u64,
}

/// Quotes a Postgres identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Base tables in the public schema, sorted by name.
pub async fn list_tables(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = 'public' AND table_type = 'BASE TABLE'
        ORDER BY table_name
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Every public table with its exact row count.
pub async fn inspect_tables(pool: &PgPool) -> Result<Vec<TableSummary>, MaintenanceError> {
    let tables = list_tables(pool).await?;
    let mut summaries = Vec::with_capacity(tables.len());

    for name in tables {
        let sql = format!("SELECT COUNT(*) FROM public.{}", quote_identifier(&name));
        let row_count: i64 = sqlx::query_scalar(&sql).fetch_one(pool).await?;
        summaries.push(TableSummary { name, row_count });
    }

    Ok(summaries)
}

/// Columns of one public table in ordinal order.
pub async fn describe_table(pool: &PgPool, table: &str) -> Result<Vec<ColumnInfo>, MaintenanceError> {
    let columns = sqlx::query_as::<_, ColumnInfo>(
        r#"
        SELECT column_name::text, data_type::text, is_nullable::text, column_default::text
        FROM information_schema.columns
        WHERE table_schema = 'public' AND table_name = $1
        ORDER BY ordinal_position
        "#,
    )
    .bind(table)
    .fetch_all(pool)
    .await?;

    if columns.is_empty() {
        return Err(MaintenanceError::UnknownTable(table.to_string()));
    }

    Ok(columns)
}

/// Drops the public schema with everything in it, recreates it and re-runs
/// migrations. Destroys all data.
pub async fn reset_schema(pool: &PgPool) -> Result<(), MaintenanceError> {
    warn!("Dropping and recreating the public schema");

    let mut tx = pool.begin().await?;
    sqlx::query("DROP SCHEMA IF EXISTS public CASCADE")
        .execute(&mut *tx)
        .await?;
    sqlx::query("CREATE SCHEMA public").execute(&mut *tx).await?;
    sqlx::query("GRANT ALL ON SCHEMA public TO public")
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    run_migrations(pool).await?;

    info!("Schema reset complete");
    Ok(())
}

/// Deletes expired sessions and expired or consumed magic-link records.
pub async fn cleanup_expired(pool: &PgPool) -> Result<CleanupReport, MaintenanceError> {
    let sessions = Session::delete_expired(pool).await?;
    let verifications = Verification::delete_expired(pool).await?;

    info!(sessions, verifications, "Expired auth records removed");
    Ok(CleanupReport {
        sessions,
        verifications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("users"), "\"users\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn test_unknown_table_message() {
        let err = MaintenanceError::UnknownTable("nope".to_string());
        assert_eq!(err.to_string(), "Unknown table: nope");
    }
}
