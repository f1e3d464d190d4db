//! PostgreSQL usage record repository

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::usage::{UsageRecord, UsageRecordRepository};
use crate::domain::DomainError;

/// PostgreSQL implementation of UsageRecordRepository
#[derive(Debug, Clone)]
pub struct PostgresUsageRecordRepository {
    pool: PgPool,
}

impl PostgresUsageRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageRecordRepository for PostgresUsageRecordRepository {
    async fn record(&self, record: UsageRecord) -> Result<UsageRecord, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO usage_records (
                id, user_id, provider_id, model_id, chat_id,
                input_tokens, output_tokens, cost_usd, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id().as_str())
        .bind(&record.user_id)
        .bind(&record.provider_id)
        .bind(&record.model_id)
        .bind(&record.chat_id)
        .bind(i64::from(record.input_tokens))
        .bind(i64::from(record.output_tokens))
        .bind(record.cost_usd)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to record usage: {}", e)))?;

        Ok(record)
    }

    async fn sum_cost_for_chat(&self, user_id: &str, chat_id: &str) -> Result<f64, DomainError> {
        let total: f64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(cost_usd), 0)::DOUBLE PRECISION
            FROM usage_records
            WHERE user_id = $1 AND chat_id = $2
            "#,
        )
        .bind(user_id)
        .bind(chat_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to sum chat usage: {}", e)))?;

        Ok(total)
    }
}
