//! Storage factory for runtime backend selection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use crate::domain::budget::{BudgetAlertRepository, BudgetLimitRepository};
use crate::domain::usage::UsageRecordRepository;
use crate::domain::DomainError;
use crate::infrastructure::budget::{
    InMemoryBudgetAlertRepository, InMemoryBudgetLimitRepository, PostgresBudgetAlertRepository,
    PostgresBudgetLimitRepository,
};
use crate::infrastructure::usage::{InMemoryUsageRecordRepository, PostgresUsageRecordRepository};

use super::migrations::run_storage_migrations;
use super::postgres::{connect_pool, PostgresConfig};

/// Supported storage types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageType {
    /// In-memory storage (for testing/development)
    InMemory,
    /// PostgreSQL storage
    Postgres,
}

impl StorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            _ => None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub enum StorageConfig {
    InMemory,
    Postgres {
        config: PostgresConfig,
        /// Apply pending migrations when connecting
        run_migrations: bool,
    },
}

impl StorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn postgres(config: PostgresConfig, run_migrations: bool) -> Self {
        Self::Postgres {
            config,
            run_migrations,
        }
    }

    pub fn storage_type(&self) -> StorageType {
        match self {
            Self::InMemory => StorageType::InMemory,
            Self::Postgres { .. } => StorageType::Postgres,
        }
    }
}

/// Repositories backing the budget and usage services
#[derive(Clone)]
pub struct StorageRepositories {
    pub limits: Arc<dyn BudgetLimitRepository>,
    pub alerts: Arc<dyn BudgetAlertRepository>,
    pub usage: Arc<dyn UsageRecordRepository>,
    /// Present for the PostgreSQL backend
    pub pool: Option<PgPool>,
}

impl std::fmt::Debug for StorageRepositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageRepositories")
            .field("postgres", &self.pool.is_some())
            .finish_non_exhaustive()
    }
}

/// Factory for creating storage backends
#[derive(Debug)]
pub struct StorageFactory;

impl StorageFactory {
    /// Creates the repositories for the configured backend
    pub async fn create(config: &StorageConfig) -> Result<StorageRepositories, DomainError> {
        match config {
            StorageConfig::InMemory => {
                info!("Using in-memory storage");
                Ok(Self::create_in_memory())
            }
            StorageConfig::Postgres {
                config,
                run_migrations,
            } => {
                let pool = connect_pool(config).await?;

                if *run_migrations {
                    let applied = run_storage_migrations(&pool).await?;
                    info!(applied = applied, "Storage migrations complete");
                }

                Ok(Self::create_postgres(pool))
            }
        }
    }

    pub fn create_in_memory() -> StorageRepositories {
        StorageRepositories {
            limits: Arc::new(InMemoryBudgetLimitRepository::new()),
            alerts: Arc::new(InMemoryBudgetAlertRepository::new()),
            usage: Arc::new(InMemoryUsageRecordRepository::new()),
            pool: None,
        }
    }

    pub fn create_postgres(pool: PgPool) -> StorageRepositories {
        StorageRepositories {
            limits: Arc::new(PostgresBudgetLimitRepository::new(pool.clone())),
            alerts: Arc::new(PostgresBudgetAlertRepository::new(pool.clone())),
            usage: Arc::new(PostgresUsageRecordRepository::new(pool.clone())),
            pool: Some(pool),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!(StorageType::from_str("memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("in_memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("In-Memory"), Some(StorageType::InMemory));
        assert_eq!(StorageType::from_str("postgres"), Some(StorageType::Postgres));
        assert_eq!(StorageType::from_str("PG"), Some(StorageType::Postgres));
        assert_eq!(StorageType::from_str("redis"), None);
    }

    #[test]
    fn test_storage_config_types() {
        assert_eq!(StorageConfig::in_memory().storage_type(), StorageType::InMemory);

        let postgres = StorageConfig::postgres(PostgresConfig::new("postgres://db/test"), true);
        assert_eq!(postgres.storage_type(), StorageType::Postgres);
    }

    #[tokio::test]
    async fn test_in_memory_repositories_start_empty() {
        let repos = StorageFactory::create(&StorageConfig::in_memory()).await.unwrap();

        assert!(repos.pool.is_none());
        assert!(repos.limits.list_for_user("user-1").await.unwrap().is_empty());
        assert_eq!(repos.alerts.count("user-1", false).await.unwrap(), 0);
        assert_eq!(repos.usage.sum_cost_for_chat("user-1", "c").await.unwrap(), 0.0);
        repos.limits.ping().await.unwrap();
    }
}
