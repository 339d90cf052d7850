//! Table inspection command
//!
//! Usage: alifh-cli inspect-tables [--table NAME] [--json]

use alifh_shared::db::maintenance::{describe_table, inspect_tables, ColumnInfo, TableSummary};
use clap::Args;

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Describe this table's columns instead of listing tables
    #[arg(long)]
    pub table: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(database_url: &str, args: InspectArgs) -> anyhow::Result<()> {
    let pool = super::connect(database_url).await?;

    match &args.table {
        Some(table) => {
            let columns = describe_table(&pool, table).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&columns)?);
            } else {
                print!("{}", format_columns(table, &columns));
            }
        }
        None => {
            let tables = inspect_tables(&pool).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                print!("{}", format_tables(&tables));
            }
        }
    }

    pool.close().await;
    Ok(())
}

fn format_tables(tables: &[TableSummary]) -> String {
    if tables.is_empty() {
        return "No tables in the public schema\n".to_string();
    }

    let width = tables.iter().map(|t| t.name.len()).max().unwrap_or(0).max(5);
    let mut out = format!("{:<width$}  ROWS\n", "TABLE");
    for table in tables {
        out.push_str(&format!("{:<width$}  {}\n", table.name, table.row_count));
    }
    out
}

fn format_columns(table: &str, columns: &[ColumnInfo]) -> String {
    let width = columns
        .iter()
        .map(|c| c.column_name.len())
        .max()
        .unwrap_or(0)
        .max(6);

    let mut out = format!("{}\n", table);
    for column in columns {
        out.push_str(&format!(
            "  {:<width$}  {}{}{}\n",
            column.column_name,
            column.data_type,
            if column.is_nullable == "YES" { "" } else { " NOT NULL" },
            column
                .column_default
                .as_deref()
                .map(|d| format!(" DEFAULT {}", d))
                .unwrap_or_default(),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tables() {
        let out = format_tables(&[
            TableSummary {
                name: "users".to_string(),
                row_count: 7,
            },
            TableSummary {
                name: "partner_memberships".to_string(),
                row_count: 12,
            },
        ]);

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("TABLE"));
        assert!(lines[1].starts_with("users "));
        assert!(lines[1].ends_with(" 7"));
        assert!(lines[2].ends_with(" 12"));
    }

    #[test]
    fn test_format_empty_schema() {
        assert_eq!(format_tables(&[]), "No tables in the public schema\n");
    }

    #[test]
    fn test_format_columns() {
        let out = format_columns(
            "users",
            &[
                ColumnInfo {
                    column_name: "id".to_string(),
                    data_type: "uuid".to_string(),
                    is_nullable: "NO".to_string(),
                    column_default: Some("gen_random_uuid()".to_string()),
                },
                ColumnInfo {
                    column_name: "name".to_string(),
                    data_type: "character varying".to_string(),
                    is_nullable: "YES".to_string(),
                    column_default: None,
                },
            ],
        );

        assert!(out.contains("uuid NOT NULL DEFAULT gen_random_uuid()"));
        assert!(out.trim_end().ends_with("character varying"));
    }
}
