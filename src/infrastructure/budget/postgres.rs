//! PostgreSQL budget repository implementations

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};

use crate::domain::budget::{
    start_of_day, start_of_month, AlertQuery, AlertType, BudgetAlert, BudgetAlertId,
    BudgetAlertRepository, BudgetLimit, BudgetLimitId, BudgetLimitRepository,
    BudgetLimitSettings, BudgetScope, BudgetType, ResetPlan,
};
use crate::domain::DomainError;

const LIMIT_COLUMNS: &str = r#"
    id, user_id, provider_id, monthly_budget_usd, daily_budget_usd, per_chat_budget_usd,
    current_month_spend, current_day_spend, month_reset, day_reset,
    warning_threshold_percent, enforce_limits, email_notifications, in_app_notifications,
    created_at, updated_at
"#;

const ALERT_COLUMNS: &str = r#"
    id, user_id, alert_type, budget_type, threshold_percent, amount_spent, budget_limit,
    message, acknowledged, created_at
"#;

/// PostgreSQL implementation of BudgetLimitRepository
///
/// Counter updates run as single `UPDATE ... RETURNING` statements so
/// concurrent requests never overwrite each other's spend.
#[derive(Debug, Clone)]
pub struct PostgresBudgetLimitRepository {
    pool: PgPool,
}

impl PostgresBudgetLimitRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BudgetLimitRepository for PostgresBudgetLimitRepository {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<BudgetLimit>, DomainError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM budget_limits WHERE user_id = $1 ORDER BY provider_id ASC NULLS FIRST",
            LIMIT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list budget limits: {}", e)))?;

        rows.iter().map(row_to_limit).collect()
    }

    async fn find_for_scope(
        &self,
        user_id: &str,
        provider_id: Option<&str>,
    ) -> Result<Vec<BudgetLimit>, DomainError> {
        let provider = BudgetScope::from_provider(provider_id);

        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM budget_limits
            WHERE user_id = $1 AND (provider_id IS NULL OR provider_id = $2)
            ORDER BY provider_id ASC NULLS FIRST
            "#,
            LIMIT_COLUMNS
        ))
        .bind(user_id)
        .bind(provider.provider_id())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to find budget limits: {}", e)))?;

        rows.iter().map(row_to_limit).collect()
    }

    async fn get_global(&self, user_id: &str) -> Result<Option<BudgetLimit>, DomainError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM budget_limits WHERE user_id = $1 AND provider_id IS NULL",
            LIMIT_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to get global budget limit: {}", e)))?;

        row.as_ref().map(row_to_limit).transpose()
    }

    async fn upsert(
        &self,
        user_id: &str,
        settings: &BudgetLimitSettings,
        now: DateTime<Utc>,
    ) -> Result<BudgetLimit, DomainError> {
        let scope = settings.scope();

        let row = sqlx::query(&format!(
            r#"
            INSERT INTO budget_limits (
                id, user_id, provider_id, monthly_budget_usd, daily_budget_usd,
                per_chat_budget_usd, warning_threshold_percent, enforce_limits,
                email_notifications, in_app_notifications, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            ON CONFLICT (user_id, (COALESCE(provider_id, ''))) DO UPDATE SET
                monthly_budget_usd = EXCLUDED.monthly_budget_usd,
                daily_budget_usd = EXCLUDED.daily_budget_usd,
                per_chat_budget_usd = EXCLUDED.per_chat_budget_usd,
                warning_threshold_percent = EXCLUDED.warning_threshold_percent,
                enforce_limits = EXCLUDED.enforce_limits,
                email_notifications = EXCLUDED.email_notifications,
                in_app_notifications = EXCLUDED.in_app_notifications,
                updated_at = EXCLUDED.updated_at
            RETURNING {}
            "#,
            LIMIT_COLUMNS
        ))
        .bind(BudgetLimitId::generate().as_str())
        .bind(user_id)
        .bind(scope.provider_id())
        .bind(settings.monthly_budget_usd)
        .bind(settings.daily_budget_usd)
        .bind(settings.per_chat_budget_usd)
        .bind(i16::from(settings.warning_threshold_percent))
        .bind(settings.enforce_limits)
        .bind(settings.email_notifications)
        .bind(settings.in_app_notifications)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to save budget limit: {}", e)))?;

        row_to_limit(&row)
    }

    async fn apply_resets(
        &self,
        id: &BudgetLimitId,
        plan: ResetPlan,
        now: DateTime<Utc>,
    ) -> Result<Option<BudgetLimit>, DomainError> {
        // Stamps before the current period start mean the reset is still due
        let row = sqlx::query(&format!(
            r#"
            UPDATE budget_limits SET
                current_day_spend = CASE
                    WHEN $2 AND (day_reset IS NULL OR day_reset < $5) THEN 0
                    ELSE current_day_spend END,
                day_reset = CASE
                    WHEN $2 AND (day_reset IS NULL OR day_reset < $5) THEN $4
                    ELSE day_reset END,
                current_month_spend = CASE
                    WHEN $3 AND (month_reset IS NULL OR month_reset < $6) THEN 0
                    ELSE current_month_spend END,
                month_reset = CASE
                    WHEN $3 AND (month_reset IS NULL OR month_reset < $6) THEN $4
                    ELSE month_reset END,
                updated_at = $4
            WHERE id = $1
            RETURNING {}
            "#,
            LIMIT_COLUMNS
        ))
        .bind(id.as_str())
        .bind(plan.day)
        .bind(plan.month)
        .bind(now)
        .bind(start_of_day(now))
        .bind(start_of_month(now))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to reset budget counters: {}", e)))?;

        row.as_ref().map(row_to_limit).transpose()
    }

    async fn add_spend(
        &self,
        id: &BudgetLimitId,
        cost_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<BudgetLimit>, DomainError> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE budget_limits SET
                current_day_spend = current_day_spend + $2,
                current_month_spend = current_month_spend + $2,
                day_reset = COALESCE(day_reset, $3),
                month_reset = COALESCE(month_reset, $3),
                updated_at = $3
            WHERE id = $1
            RETURNING {}
            "#,
            LIMIT_COLUMNS
        ))
        .bind(id.as_str())
        .bind(cost_usd)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to record budget spend: {}", e)))?;

        row.as_ref().map(row_to_limit).transpose()
    }

    async fn delete(&self, user_id: &str, id: &BudgetLimitId) -> Result<bool, DomainError> {
        let result = sqlx::query("DELETE FROM budget_limits WHERE id = $1 AND user_id = $2")
            .bind(id.as_str())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete budget limit: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, user_id: &str) -> Result<usize, DomainError> {
        let result = sqlx::query("DELETE FROM budget_limits WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to delete budget limits: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }

    async fn ping(&self) -> Result<(), DomainError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Database unreachable: {}", e)))?;

        Ok(())
    }
}

/// PostgreSQL implementation of BudgetAlertRepository
#[derive(Debug, Clone)]
pub struct PostgresBudgetAlertRepository {
    pool: PgPool,
}

impl PostgresBudgetAlertRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BudgetAlertRepository for PostgresBudgetAlertRepository {
    async fn find_recent(
        &self,
        user_id: &str,
        alert_type: AlertType,
        budget_type: BudgetType,
        since: DateTime<Utc>,
    ) -> Result<Option<BudgetAlert>, DomainError> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {} FROM budget_alerts
            WHERE user_id = $1 AND alert_type = $2 AND budget_type = $3 AND created_at >= $4
            ORDER BY created_at DESC
            LIMIT 1
            "#,
            ALERT_COLUMNS
        ))
        .bind(user_id)
        .bind(alert_type.as_str())
        .bind(budget_type.as_str())
        .bind(since)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to find recent alert: {}", e)))?;

        row.as_ref().map(row_to_alert).transpose()
    }

    async fn insert(&self, alert: BudgetAlert) -> Result<BudgetAlert, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO budget_alerts (
                id, user_id, alert_type, budget_type, threshold_percent, amount_spent,
                budget_limit, message, acknowledged, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(alert.id.as_str())
        .bind(&alert.user_id)
        .bind(alert.alert_type.as_str())
        .bind(alert.budget_type.as_str())
        .bind(i16::from(alert.threshold_percent))
        .bind(alert.amount_spent)
        .bind(alert.budget_limit)
        .bind(&alert.message)
        .bind(alert.acknowledged)
        .bind(alert.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create budget alert: {}", e)))?;

        Ok(alert)
    }

    async fn list(
        &self,
        user_id: &str,
        query: &AlertQuery,
    ) -> Result<Vec<BudgetAlert>, DomainError> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {} FROM budget_alerts
            WHERE user_id = $1 AND (NOT $2 OR acknowledged = FALSE)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            ALERT_COLUMNS
        ))
        .bind(user_id)
        .bind(query.unacknowledged_only)
        .bind(query.limit as i64)
        .bind(query.offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to list budget alerts: {}", e)))?;

        rows.iter().map(row_to_alert).collect()
    }

    async fn count(&self, user_id: &str, unacknowledged_only: bool) -> Result<usize, DomainError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM budget_alerts WHERE user_id = $1 AND (NOT $2 OR acknowledged = FALSE)",
        )
        .bind(user_id)
        .bind(unacknowledged_only)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to count budget alerts: {}", e)))?;

        Ok(count as usize)
    }

    async fn acknowledge(&self, user_id: &str, alert_ids: &[String]) -> Result<usize, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE budget_alerts SET acknowledged = TRUE
            WHERE user_id = $1 AND id = ANY($2) AND acknowledged = FALSE
            "#,
        )
        .bind(user_id)
        .bind(alert_ids)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to acknowledge alerts: {}", e)))?;

        Ok(result.rows_affected() as usize)
    }
}

fn percent_from_db(value: i16, column: &str) -> Result<u8, DomainError> {
    u8::try_from(value)
        .map_err(|_| DomainError::storage(format!("Invalid {} in database: {}", column, value)))
}

fn row_to_limit(row: &sqlx::postgres::PgRow) -> Result<BudgetLimit, DomainError> {
    let id: String = row.get("id");
    let user_id: String = row.get("user_id");
    let provider_id: Option<String> = row.get("provider_id");
    let warning_threshold: i16 = row.get("warning_threshold_percent");
    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");

    let settings = BudgetLimitSettings {
        provider_id,
        monthly_budget_usd: row.get("monthly_budget_usd"),
        daily_budget_usd: row.get("daily_budget_usd"),
        per_chat_budget_usd: row.get("per_chat_budget_usd"),
        warning_threshold_percent: percent_from_db(warning_threshold, "warning threshold")?,
        enforce_limits: row.get("enforce_limits"),
        email_notifications: row.get("email_notifications"),
        in_app_notifications: row.get("in_app_notifications"),
    };

    let mut limit = BudgetLimit::new(id, user_id, &settings, created_at).with_counters(
        row.get("current_month_spend"),
        row.get("current_day_spend"),
        row.get("month_reset"),
        row.get("day_reset"),
    );
    limit.updated_at = updated_at;

    Ok(limit)
}

fn row_to_alert(row: &sqlx::postgres::PgRow) -> Result<BudgetAlert, DomainError> {
    let id: String = row.get("id");
    let alert_type: String = row.get("alert_type");
    let budget_type: String = row.get("budget_type");
    let threshold: i16 = row.get("threshold_percent");

    Ok(BudgetAlert {
        id: BudgetAlertId::new(id),
        user_id: row.get("user_id"),
        alert_type: AlertType::parse(&alert_type).ok_or_else(|| {
            DomainError::storage(format!("Invalid alert type in database: {}", alert_type))
        })?,
        budget_type: BudgetType::parse(&budget_type).ok_or_else(|| {
            DomainError::storage(format!("Invalid budget type in database: {}", budget_type))
        })?,
        threshold_percent: percent_from_db(threshold, "threshold")?,
        amount_spent: row.get("amount_spent"),
        budget_limit: row.get("budget_limit"),
        message: row.get("message"),
        acknowledged: row.get("acknowledged"),
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_from_db() {
        assert_eq!(percent_from_db(80, "threshold").unwrap(), 80);
        assert!(percent_from_db(-1, "threshold").is_err());
        assert!(percent_from_db(300, "threshold").is_err());
    }

    #[test]
    fn test_column_lists_match_tables() {
        for column in ["current_month_spend", "day_reset", "warning_threshold_percent"] {
            assert!(LIMIT_COLUMNS.contains(column));
        }
        for column in ["alert_type", "budget_type", "acknowledged"] {
            assert!(ALERT_COLUMNS.contains(column));
        }
    }
}
