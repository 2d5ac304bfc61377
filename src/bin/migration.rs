use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use storefront_api::{config, db, migrator::Migrator};

#[derive(Debug, Parser)]
#[command(name = "migration", about = "Apply or roll back the storefront schema")]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations
    Up {
        #[arg(long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations, the latest first
    Down {
        #[arg(long, default_value_t = 1)]
        steps: u32,
    },
    /// Show which migrations are applied
    Status,
    /// Drop everything and apply all migrations again
    Fresh,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    let pool = db::establish_connection_from_app_config(&cfg).await?;

    let result = match cli.command {
        Command::Up { steps } => {
            info!(?steps, "applying migrations");
            Migrator::up(&pool, steps).await
        }
        Command::Down { steps } => {
            info!(steps, "rolling back migrations");
            Migrator::down(&pool, Some(steps)).await
        }
        Command::Status => Migrator::status(&pool).await,
        Command::Fresh => {
            info!("recreating schema");
            Migrator::fresh(&pool).await
        }
    };

    if let Err(e) = result {
        error!("migration command failed: {}", e);
        return Err(e.into());
    }

    info!("migration command completed");
    Ok(())
}
