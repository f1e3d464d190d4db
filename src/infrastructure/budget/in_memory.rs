//! In-memory implementations of the budget repositories

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::budget::{
    AlertQuery, AlertType, BudgetAlert, BudgetAlertRepository, BudgetLimit, BudgetLimitId,
    BudgetLimitRepository, BudgetLimitSettings, BudgetScope, BudgetType, ResetPlan,
};
use crate::domain::DomainError;

fn lock_error(e: impl std::fmt::Display) -> DomainError {
    DomainError::internal(format!("Failed to acquire lock: {}", e))
}

/// Global row first, then provider rows by provider ID
fn sort_limits(limits: &mut [BudgetLimit]) {
    limits.sort_by(|a, b| match (&a.provider_id, &b.provider_id) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Less,
        (Some(_), None) => std::cmp::Ordering::Greater,
        (Some(a), Some(b)) => a.cmp(b),
    });
}

/// In-memory budget limit repository
///
/// Rows are keyed by ID; the one-row-per-scope rule is kept by `upsert`.
#[derive(Debug, Default)]
pub struct InMemoryBudgetLimitRepository {
    limits: RwLock<HashMap<BudgetLimitId, BudgetLimit>>,
}

impl InMemoryBudgetLimitRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a row as-is, replacing any row with the same ID
    pub fn insert(&self, limit: BudgetLimit) -> Result<(), DomainError> {
        let mut limits = self.limits.write().map_err(lock_error)?;
        limits.insert(limit.id().clone(), limit);
        Ok(())
    }

    /// Fetch a row by ID
    pub fn get(&self, id: &BudgetLimitId) -> Result<Option<BudgetLimit>, DomainError> {
        let limits = self.limits.read().map_err(lock_error)?;
        Ok(limits.get(id).cloned())
    }
}

#[async_trait]
impl BudgetLimitRepository for InMemoryBudgetLimitRepository {
    async fn list_for_user(&self, user_id: &str) -> Result<Vec<BudgetLimit>, DomainError> {
        let limits = self.limits.read().map_err(lock_error)?;

        let mut results: Vec<_> = limits
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();

        sort_limits(&mut results);
        Ok(results)
    }

    async fn find_for_scope(
        &self,
        user_id: &str,
        provider_id: Option<&str>,
    ) -> Result<Vec<BudgetLimit>, DomainError> {
        let scope = BudgetScope::from_provider(provider_id);
        let limits = self.limits.read().map_err(lock_error)?;

        let mut results: Vec<_> = limits
            .values()
            .filter(|l| l.user_id == user_id)
            .filter(|l| l.is_global() || l.scope() == scope)
            .cloned()
            .collect();

        sort_limits(&mut results);
        Ok(results)
    }

    async fn get_global(&self, user_id: &str) -> Result<Option<BudgetLimit>, DomainError> {
        let limits = self.limits.read().map_err(lock_error)?;

        Ok(limits
            .values()
            .find(|l| l.user_id == user_id && l.is_global())
            .cloned())
    }

    async fn upsert(
        &self,
        user_id: &str,
        settings: &BudgetLimitSettings,
        now: DateTime<Utc>,
    ) -> Result<BudgetLimit, DomainError> {
        let scope = settings.scope();
        let mut limits = self.limits.write().map_err(lock_error)?;

        if let Some(existing) = limits
            .values_mut()
            .find(|l| l.user_id == user_id && l.scope() == scope)
        {
            existing.apply_settings(settings, now);
            return Ok(existing.clone());
        }

        let limit = BudgetLimit::new(BudgetLimitId::generate(), user_id, settings, now);
        limits.insert(limit.id().clone(), limit.clone());

        Ok(limit)
    }

    async fn apply_resets(
        &self,
        id: &BudgetLimitId,
        plan: ResetPlan,
        now: DateTime<Utc>,
    ) -> Result<Option<BudgetLimit>, DomainError> {
        let mut limits = self.limits.write().map_err(lock_error)?;

        let Some(limit) = limits.get_mut(id) else {
            return Ok(None);
        };

        // Another writer may already have reset this period
        plan.intersect(ResetPlan::evaluate(limit, now))
            .apply_to(limit, now);

        Ok(Some(limit.clone()))
    }

    async fn add_spend(
        &self,
        id: &BudgetLimitId,
        cost_usd: f64,
        now: DateTime<Utc>,
    ) -> Result<Option<BudgetLimit>, DomainError> {
        let mut limits = self.limits.write().map_err(lock_error)?;

        Ok(limits.get_mut(id).map(|limit| {
            limit.add_spend(cost_usd, now);
            limit.clone()
        }))
    }

    async fn delete(&self, user_id: &str, id: &BudgetLimitId) -> Result<bool, DomainError> {
        let mut limits = self.limits.write().map_err(lock_error)?;

        match limits.get(id) {
            Some(limit) if limit.user_id == user_id => Ok(limits.remove(id).is_some()),
            _ => Ok(false),
        }
    }

    async fn delete_all(&self, user_id: &str) -> Result<usize, DomainError> {
        let mut limits = self.limits.write().map_err(lock_error)?;
        let before = limits.len();

        limits.retain(|_, l| l.user_id != user_id);

        Ok(before - limits.len())
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.limits.read().map(|_| ()).map_err(lock_error)
    }
}

/// In-memory budget alert repository
#[derive(Debug, Default)]
pub struct InMemoryBudgetAlertRepository {
    alerts: RwLock<Vec<BudgetAlert>>,
}

impl InMemoryBudgetAlertRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored alert, in insertion order
    pub fn all(&self) -> Result<Vec<BudgetAlert>, DomainError> {
        Ok(self.alerts.read().map_err(lock_error)?.clone())
    }
}

#[async_trait]
impl BudgetAlertRepository for InMemoryBudgetAlertRepository {
    async fn find_recent(
        &self,
        user_id: &str,
        alert_type: AlertType,
        budget_type: BudgetType,
        since: DateTime<Utc>,
    ) -> Result<Option<BudgetAlert>, DomainError> {
        let alerts = self.alerts.read().map_err(lock_error)?;

        Ok(alerts
            .iter()
            .filter(|a| {
                a.user_id == user_id
                    && a.alert_type == alert_type
                    && a.budget_type == budget_type
                    && a.created_at >= since
            })
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn insert(&self, alert: BudgetAlert) -> Result<BudgetAlert, DomainError> {
        let mut alerts = self.alerts.write().map_err(lock_error)?;
        alerts.push(alert.clone());
        Ok(alert)
    }

    async fn list(
        &self,
        user_id: &str,
        query: &AlertQuery,
    ) -> Result<Vec<BudgetAlert>, DomainError> {
        let alerts = self.alerts.read().map_err(lock_error)?;

        let mut results: Vec<_> = alerts
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter(|a| !query.unacknowledged_only || !a.acknowledged)
            .cloned()
            .collect();

        // Newest first; stable sort keeps later inserts ahead on ties
        results.reverse();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(results
            .into_iter()
            .skip(query.offset)
            .take(query.limit)
            .collect())
    }

    async fn count(&self, user_id: &str, unacknowledged_only: bool) -> Result<usize, DomainError> {
        let alerts = self.alerts.read().map_err(lock_error)?;

        Ok(alerts
            .iter()
            .filter(|a| a.user_id == user_id && (!unacknowledged_only || !a.acknowledged))
            .count())
    }

    async fn acknowledge(&self, user_id: &str, alert_ids: &[String]) -> Result<usize, DomainError> {
        let mut alerts = self.alerts.write().map_err(lock_error)?;
        let mut updated = 0;

        for alert in alerts
            .iter_mut()
            .filter(|a| a.user_id == user_id && !a.acknowledged)
            .filter(|a| alert_ids.iter().any(|id| id == a.id.as_str()))
        {
            alert.acknowledged = true;
            updated += 1;
        }

        Ok(updated)
    }
}
