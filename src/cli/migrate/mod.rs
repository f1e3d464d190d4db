//! Migrate command - applies or reverts the Postgres schema

use anyhow::Context;
use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::infrastructure::observability::init_tracing;
use crate::infrastructure::storage::{connect_pool, Migrator, PostgresMigrator, StorageConfig};

#[derive(Debug, Args)]
pub struct MigrateArgs {
    /// Revert the latest applied migration instead of applying pending ones
    #[arg(long)]
    pub revert: bool,

    /// Database URL, overriding configuration and DATABASE_URL
    #[arg(long)]
    pub database_url: Option<String>,
}

/// Run the migrations against the configured Postgres database
pub async fn run(args: MigrateArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    init_tracing(&config.logging, &config.observability.tracing);

    let pg_config = match args.database_url {
        Some(url) => config.storage.postgres_config(url),
        None => {
            let mut storage = config.storage.clone();
            storage.backend = "postgres".to_string();

            match storage.to_storage_config()? {
                StorageConfig::Postgres { config, .. } => config,
                StorageConfig::InMemory => anyhow::bail!("migrations need a Postgres database"),
            }
        }
    };

    let pool = connect_pool(&pg_config)
        .await
        .context("failed to connect for migrations")?;
    let migrator = PostgresMigrator::new(pool);

    if args.revert {
        match migrator.revert().await? {
            Some(version) => info!(version = version, "Reverted migration"),
            None => info!("No migration to revert"),
        }
    } else {
        let applied = migrator.run().await?;
        info!(
            applied = applied,
            version = ?migrator.version().await?,
            "Migrations complete"
        );
    }

    Ok(())
}
