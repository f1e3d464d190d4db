//! Budget repository traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{
    AlertQuery, AlertType, BudgetAlert, BudgetLimit, BudgetLimitId, BudgetLimitSettings,
    BudgetType, ResetPlan,
};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository for budget limit rows and their running totals
#[async_trait]
pub trait BudgetLimitRepository: Send + Sync {
    /// All rows for a user, global row first, then provider rows by provider ID
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<BudgetLimit>, DomainError>;

    /// Rows for the given provider plus the global row
    async fn find_for_scope(
        &self,
        user_id: &str,
        provider_id: Option<&str>,
    ) -> Result<Vec<BudgetLimit>, DomainError>;

    /// The user's global row
    async fn get_global(&self, user_id: &str) -> Result<Option<BudgetLimit>, DomainError>;

    /// Insert or update the row for the settings' scope, keeping counters
    async fn upsert(
        &self,
        user_id: &str,
        settings: &BudgetLimitSettings,
        now: DateTime<Utc>,
    ) -> Result<BudgetLimit, DomainError>;

    /// Zero the counters in `plan` if the stored stamps are still from an earlier period.
    ///
    /// Returns the row as stored afterwards, or `None` if it no longer exists.
    async fn apply_resets(
        &self,
        id: &BudgetLimitId,
        plan: ResetPlan,
        now: DateTime<Utc>,
    ) -> Result<Option<BudgetLimit>, DomainError>;

    /// Atomically add `cost_usd` to both running totals, returning the updated row
    async fn add_spend(
        &self,
        id: &BudgetLimitId,
        cost_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<BudgetLimit>, DomainError>;

    /// Delete one of the user's rows
    async fn delete(&self, user_id: &str, id: &BudgetLimitId) -> Result<bool, DomainError>;

    /// Delete every row of the user
    async fn delete_all(&self, user_id: &str) -> Result<usize, DomainError>;

    /// Check the store is reachable
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Repository for budget alerts
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BudgetAlertRepository: Send + Sync {
    /// Most recent alert of this kind created at or after `since`
    async fn find_recent(
        &self,
        user_id: &str,
        alert_type: AlertType,
        budget_type: BudgetType,
        since: DateTime<Utc>,
    ) -> Result<Option<BudgetAlert>, DomainError>;

    async fn insert(&self, alert: BudgetAlert) -> Result<BudgetAlert, DomainError>;

    /// Page of the user's alerts, newest first
    async fn list(&self, user_id: &str, query: &AlertQuery)
    -> Result<Vec<BudgetAlert>, DomainError>;

    async fn count(&self, user_id: &str, unacknowledged_only: bool) -> Result<usize, DomainError>;

    /// Mark the given alerts acknowledged; IDs owned by other users are ignored
    async fn acknowledge(&self, user_id: &str, alert_ids: &[String]) -> Result<usize, DomainError>;
}
