//! Alifh CLI
//!
//! Maintenance commands for the marketplace database: migrations, demo
//! seeding, role assignment, table inspection and schema reset.
//!
//! ```bash
//! alifh-cli migrate --status
//! alifh-cli seed-users
//! alifh-cli setup-roles --email owner@example.com --partner demo-motors --partner-role owner
//! alifh-cli inspect-tables --table users
//! alifh-cli reset-schema --yes
//! ```

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "alifh-cli")]
#[command(about = "Alifh marketplace maintenance tools", long_about = None)]
struct Cli {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending migrations, or print their status
    Migrate(commands::migrate::MigrateArgs),
    /// Create demo users, partners and memberships (idempotent)
    SeedUsers(commands::seed::SeedArgs),
    /// Set a user's platform role or partner membership
    SetupRoles(commands::roles::SetupRolesArgs),
    /// List tables with row counts, or describe one table
    InspectTables(commands::inspect::InspectArgs),
    /// Drop and recreate the public schema, then migrate
    ResetSchema(commands::reset::ResetArgs),
    /// Delete expired sessions and magic-link records
    Cleanup,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alifh_cli=info,alifh_shared=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let url = cli.database_url;

    match cli.command {
        Commands::Migrate(args) => commands::migrate::execute(&url, args).await,
        Commands::SeedUsers(args) => commands::seed::execute(&url, args).await,
        Commands::SetupRoles(args) => commands::roles::execute(&url, args).await,
        Commands::InspectTables(args) => commands::inspect::execute(&url, args).await,
        Commands::ResetSchema(args) => commands::reset::execute(&url, args).await,
        Commands::Cleanup => commands::cleanup::execute(&url).await,
    }
}
