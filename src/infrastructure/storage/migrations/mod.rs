//! Database migrations

use async_trait::async_trait;
use sqlx::Executor;
use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// Trait for running database migrations
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Runs all pending migrations, returning how many were applied
    async fn run(&self) -> Result<usize, DomainError>;

    /// Reverts the latest applied migration, returning its version
    async fn revert(&self) -> Result<Option<i64>, DomainError>;

    /// Returns the current migration version
    async fn version(&self) -> Result<Option<i64>, DomainError>;
}

/// A versioned schema change
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    /// SQL to run when applying the migration
    pub up: String,
    /// SQL to run when reverting the migration
    pub down: String,
}

impl Migration {
    pub fn new(
        version: i64,
        description: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
            down: down.into(),
        }
    }
}

/// PostgreSQL migrator tracking applied versions in `_migrations`
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
    migrations: Vec<Migration>,
}

impl PostgresMigrator {
    /// Migrator over the budget schema
    pub fn new(pool: PgPool) -> Self {
        Self::with_migrations(pool, budget_migrations())
    }

    pub fn with_migrations(pool: PgPool, mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by_key(|m| m.version);
        Self { pool, migrations }
    }

    async fn ensure_migrations_table(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migrations table: {}", e)))?;

        Ok(())
    }

    async fn is_applied(&self, version: i64) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _migrations WHERE version = $1)")
            .bind(version)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to check migration status: {}", e)))
    }

    /// Apply one migration and record it in the same transaction
    async fn apply(&self, migration: &Migration) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::storage(format!("Failed to start migration transaction: {}", e))
        })?;

        (&mut *tx)
            .execute(sqlx::raw_sql(&migration.up))
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to run migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to record migration {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to commit migration {}: {}",
                migration.version, e
            ))
        })?;

        info!(
            version = migration.version,
            description = %migration.description,
            "Applied migration"
        );

        Ok(())
    }

    async fn unapply(&self, migration: &Migration) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            DomainError::storage(format!("Failed to start migration transaction: {}", e))
        })?;

        (&mut *tx)
            .execute(sqlx::raw_sql(&migration.down))
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to revert migration {}: {}",
                    migration.version, e
                ))
            })?;

        sqlx::query("DELETE FROM _migrations WHERE version = $1")
            .bind(migration.version)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                DomainError::storage(format!(
                    "Failed to remove migration record {}: {}",
                    migration.version, e
                ))
            })?;

        tx.commit().await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to commit migration {}: {}",
                migration.version, e
            ))
        })?;

        info!(version = migration.version, "Reverted migration");

        Ok(())
    }
}

#[async_trait]
impl Migrator for PostgresMigrator {
    async fn run(&self) -> Result<usize, DomainError> {
        self.ensure_migrations_table().await?;

        let mut applied = 0;

        for migration in &self.migrations {
            if self.is_applied(migration.version).await? {
                continue;
            }

            self.apply(migration).await?;
            applied += 1;
        }

        Ok(applied)
    }

    async fn revert(&self) -> Result<Option<i64>, DomainError> {
        let Some(version) = self.version().await? else {
            return Ok(None);
        };

        let migration = self
            .migrations
            .iter()
            .find(|m| m.version == version)
            .ok_or_else(|| {
                DomainError::storage(format!("Unknown applied migration version {}", version))
            })?;

        self.unapply(migration).await?;

        Ok(Some(version))
    }

    async fn version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_migrations_table().await?;

        sqlx::query_scalar("SELECT MAX(version) FROM _migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get migration version: {}", e)))
    }
}

/// Schema for budget limits, alerts and usage records
pub fn budget_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create budget_limits table",
            r#"
            CREATE TABLE IF NOT EXISTS budget_limits (
                id VARCHAR(64) PRIMARY KEY,
                user_id VARCHAR(255) NOT NULL,
                provider_id VARCHAR(100),
                monthly_budget_usd DOUBLE PRECISION,
                daily_budget_usd DOUBLE PRECISION,
                per_chat_budget_usd DOUBLE PRECISION,
                current_month_spend DOUBLE PRECISION NOT NULL DEFAULT 0,
                current_day_spend DOUBLE PRECISION NOT NULL DEFAULT 0,
                month_reset TIMESTAMPTZ,
                day_reset TIMESTAMPTZ,
                warning_threshold_percent SMALLINT NOT NULL DEFAULT 80
                    CHECK (warning_threshold_percent BETWEEN 0 AND 100),
                enforce_limits BOOLEAN NOT NULL DEFAULT TRUE,
                email_notifications BOOLEAN NOT NULL DEFAULT FALSE,
                in_app_notifications BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_budget_limits_scope
                ON budget_limits (user_id, (COALESCE(provider_id, '')));
            "#,
            r#"
            DROP TABLE IF EXISTS budget_limits;
            "#,
        ),
        Migration::new(
            2,
            "Create budget_alerts table",
            r#"
            CREATE TABLE IF NOT EXISTS budget_alerts (
                id VARCHAR(64) PRIMARY KEY,
                user_id VARCHAR(255) NOT NULL,
                alert_type VARCHAR(32) NOT NULL,
                budget_type VARCHAR(32) NOT NULL,
                threshold_percent SMALLINT NOT NULL,
                amount_spent DOUBLE PRECISION NOT NULL,
                budget_limit DOUBLE PRECISION NOT NULL,
                message TEXT NOT NULL,
                acknowledged BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_budget_alerts_recent
                ON budget_alerts (user_id, alert_type, budget_type, created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_budget_alerts_user_created
                ON budget_alerts (user_id, created_at DESC);
            "#,
            r#"
            DROP TABLE IF EXISTS budget_alerts;
            "#,
        ),
        Migration::new(
            3,
            "Create usage_records table",
            r#"
            CREATE TABLE IF NOT EXISTS usage_records (
                id VARCHAR(64) PRIMARY KEY,
                user_id VARCHAR(255) NOT NULL,
                provider_id VARCHAR(100) NOT NULL,
                model_id VARCHAR(255) NOT NULL,
                chat_id VARCHAR(255),
                input_tokens BIGINT NOT NULL DEFAULT 0,
                output_tokens BIGINT NOT NULL DEFAULT 0,
                cost_usd DOUBLE PRECISION NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            );
            CREATE INDEX IF NOT EXISTS idx_usage_records_chat
                ON usage_records (user_id, chat_id) WHERE chat_id IS NOT NULL;
            "#,
            r#"
            DROP TABLE IF EXISTS usage_records;
            "#,
        ),
    ]
}

/// Runs all pending budget migrations
pub async fn run_storage_migrations(pool: &PgPool) -> Result<usize, DomainError> {
    PostgresMigrator::new(pool.clone()).run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creation() {
        let migration = Migration::new(1, "Test migration", "CREATE TABLE test", "DROP TABLE test");

        assert_eq!(migration.version, 1);
        assert_eq!(migration.description, "Test migration");
        assert_eq!(migration.up, "CREATE TABLE test");
        assert_eq!(migration.down, "DROP TABLE test");
    }

    #[test]
    fn test_budget_migrations_are_ordered_and_complete() {
        let migrations = budget_migrations();

        assert_eq!(migrations.len(), 3);
        for pair in migrations.windows(2) {
            assert!(pair[1].version > pair[0].version);
        }
        for migration in &migrations {
            assert!(!migration.description.is_empty());
            assert!(!migration.up.trim().is_empty());
            assert!(!migration.down.trim().is_empty());
        }
    }

    #[test]
    fn test_scope_index_treats_null_provider_as_one_global_row() {
        let migrations = budget_migrations();

        assert!(migrations[0].up.contains("CREATE UNIQUE INDEX"));
        assert!(migrations[0].up.contains("COALESCE(provider_id, '')"));
    }
}
