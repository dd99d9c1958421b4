mod import;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "econbrief-cli")]
#[command(about = "econbrief operator command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Database utilities
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Load generated content from JSON files
    Import {
        #[command(subcommand)]
        command: ImportCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
}

#[derive(Debug, Subcommand)]
enum ImportCommands {
    /// Upsert analyzed articles (a JSON array, or a single object)
    Articles {
        #[arg(long)]
        file: PathBuf,
    },
    /// Upsert one daily report
    DailyReport {
        #[arg(long)]
        file: PathBuf,
    },
    /// Upsert one personalized report for a user
    PersonalizedReport {
        /// Auth-provider user id; the user is created if not yet mirrored
        #[arg(long)]
        user: String,
        #[arg(long)]
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("econbrief-cli: pass --help for available commands");
        return Ok(());
    };

    let config = econbrief_core::load_app_config()?;
    let pool_config = econbrief_db::PoolConfig::from_app_config(&config);
    let pool = econbrief_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Migrate => {
            let applied = econbrief_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations up to date");
        }
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            econbrief_db::ping(&pool).await?;
            tracing::info!("database reachable");
        }
        Commands::Import { command } => match command {
            ImportCommands::Articles { file } => import::run_import_articles(&pool, &file).await?,
            ImportCommands::DailyReport { file } => {
                import::run_import_daily_report(&pool, &file).await?;
            }
            ImportCommands::PersonalizedReport { user, file } => {
                import::run_import_personalized_report(&pool, &user, &file).await?;
            }
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests;
