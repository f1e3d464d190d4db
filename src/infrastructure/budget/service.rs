//! Budget gate, spend recorder and alert management

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::domain::budget::{
    evaluate_threshold, AlertPage, AlertQuery, BudgetAlert, BudgetAlertRepository,
    BudgetExceeded, BudgetLimit, BudgetLimitId, BudgetLimitRepository, BudgetLimitSettings,
    BudgetStatusReport, BudgetType, NewBudgetAlert, ResetPlan, ScopedBudgetLimits,
};
use crate::domain::usage::UsageRecordRepository;
use crate::domain::{Clock, DomainError};
use crate::infrastructure::observability::{
    record_alert_outcome, record_bookkeeping_failure, record_gate_outcome, record_spend,
};

/// Tunables for the budget service
#[derive(Debug, Clone)]
pub struct BudgetServiceConfig {
    /// Same-kind alerts inside this window are suppressed
    pub alert_dedup_window: Duration,
    /// Upper bound on alert page size
    pub max_alert_page_size: usize,
}

impl Default for BudgetServiceConfig {
    fn default() -> Self {
        Self {
            alert_dedup_window: Duration::hours(1),
            max_alert_page_size: 200,
        }
    }
}

/// A batch item that could not be saved
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveLimitError {
    pub index: usize,
    pub provider_id: Option<String>,
    pub message: String,
}

/// Outcome of saving a batch of limit settings
#[derive(Debug, Clone, Default)]
pub struct SaveLimitsOutcome {
    pub limits: Vec<BudgetLimit>,
    pub errors: Vec<SaveLimitError>,
}

/// Trait for budget service
#[async_trait]
pub trait BudgetServiceTrait: Send + Sync + Debug {
    /// Pre-flight gate run before a priced call.
    ///
    /// Returns the governing limit (after any due resets), `None` when the
    /// user has no applicable limit, or `DomainError::BudgetExceeded` when a
    /// ceiling has already been reached.
    async fn check_budget_before_chat(
        &self,
        user_id: &str,
        provider_id: Option<&str>,
        chat_id: Option<&str>,
    ) -> Result<Option<BudgetLimit>, DomainError>;

    /// Add the cost of a completed call to the governing limit.
    ///
    /// Best effort: failures are logged and never returned.
    async fn update_budget_spending(&self, user_id: &str, provider_id: &str, cost_usd: f64);

    /// Store an alert unless one of the same kind was raised recently
    async fn create_budget_alert(
        &self,
        alert: NewBudgetAlert,
    ) -> Result<Option<BudgetAlert>, DomainError>;

    /// Dashboard status of the user's global limit
    async fn get_status(&self, user_id: &str) -> Result<BudgetStatusReport, DomainError>;

    async fn list_limits(&self, user_id: &str) -> Result<Vec<BudgetLimit>, DomainError>;

    /// Upsert each settings item independently
    async fn save_limits(
        &self,
        user_id: &str,
        budgets: Vec<BudgetLimitSettings>,
    ) -> SaveLimitsOutcome;

    async fn delete_limits(&self, user_id: &str) -> Result<usize, DomainError>;

    async fn delete_limit(&self, user_id: &str, id: &BudgetLimitId) -> Result<bool, DomainError>;

    async fn list_alerts(&self, user_id: &str, query: AlertQuery)
    -> Result<AlertPage, DomainError>;

    async fn acknowledge_alerts(
        &self,
        user_id: &str,
        alert_ids: &[String],
    ) -> Result<usize, DomainError>;

    /// Check the backing store is reachable
    async fn ping(&self) -> Result<(), DomainError>;
}

/// Budget service implementation
pub struct BudgetService {
    limits: Arc<dyn BudgetLimitRepository>,
    alerts: Arc<dyn BudgetAlertRepository>,
    usage: Arc<dyn UsageRecordRepository>,
    clock: Arc<dyn Clock>,
    config: BudgetServiceConfig,
}

impl Debug for BudgetService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetService")
            .field("clock", &self.clock)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl BudgetService {
    pub fn new(
        limits: Arc<dyn BudgetLimitRepository>,
        alerts: Arc<dyn BudgetAlertRepository>,
        usage: Arc<dyn UsageRecordRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            limits,
            alerts,
            usage,
            clock,
            config: BudgetServiceConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BudgetServiceConfig) -> Self {
        self.config = config;
        self
    }

    /// The limit governing `provider_id`: its own row, else the global row
    async fn resolve_limit(
        &self,
        user_id: &str,
        provider_id: Option<&str>,
    ) -> Result<Option<BudgetLimit>, DomainError> {
        let rows = self.limits.find_for_scope(user_id, provider_id).await?;
        Ok(ScopedBudgetLimits::from_limits(rows).into_resolved(provider_id))
    }

    /// Zero counters whose period has rolled over.
    ///
    /// A failed write is logged and the reset is applied to the returned copy
    /// only, so the check that follows still sees the new period.
    async fn apply_due_resets(&self, limit: BudgetLimit, now: DateTime<Utc>) -> BudgetLimit {
        let plan = ResetPlan::evaluate(&limit, now);

        if plan.is_empty() {
            return limit;
        }

        debug!(
            limit_id = %limit.id(),
            user_id = %limit.user_id,
            reset_day = plan.day,
            reset_month = plan.month,
            "Applying budget period reset"
        );

        let fallback = |mut limit: BudgetLimit| {
            plan.apply_to(&mut limit, now);
            limit
        };

        let stored = self.limits.apply_resets(limit.id(), plan, now).await;

        match stored {
            Ok(Some(stored)) => stored,
            Ok(None) => fallback(limit),
            Err(e) => {
                warn!(
                    limit_id = %limit.id(),
                    user_id = %limit.user_id,
                    error = %e,
                    "Failed to persist budget reset"
                );
                record_bookkeeping_failure("reset");
                fallback(limit)
            }
        }
    }

    fn enforce(
        limit: &BudgetLimit,
        budget_type: BudgetType,
        spent: f64,
    ) -> Result<(), BudgetExceeded> {
        match limit.ceiling(budget_type) {
            Some(ceiling) if spent >= ceiling => Err(BudgetExceeded::new(
                budget_type,
                spent,
                ceiling,
                limit.provider_id.clone(),
            )),
            _ => Ok(()),
        }
    }

    async fn gate(
        &self,
        user_id: &str,
        provider_id: Option<&str>,
        chat_id: Option<&str>,
    ) -> Result<Option<BudgetLimit>, DomainError> {
        let Some(limit) = self.resolve_limit(user_id, provider_id).await? else {
            record_gate_outcome("no_budget", None);
            return Ok(None);
        };

        let limit = self.apply_due_resets(limit, self.clock.now()).await;

        if !limit.enforce_limits {
            record_gate_outcome("not_enforced", None);
            return Ok(Some(limit));
        }

        for budget_type in [BudgetType::Monthly, BudgetType::Daily] {
            let spent = limit.period_spend(budget_type).unwrap_or_default();
            Self::enforce(&limit, budget_type, spent)?;
        }

        if let (Some(chat_id), Some(_)) = (chat_id, limit.per_chat_budget_usd) {
            let spent = self.usage.sum_cost_for_chat(user_id, chat_id).await?;
            Self::enforce(&limit, BudgetType::PerChat, spent)?;
        }

        record_gate_outcome("allowed", None);
        Ok(Some(limit))
    }

    /// Record spend and return the alerts it created.
    ///
    /// Unlike [`BudgetServiceTrait::update_budget_spending`] this surfaces
    /// failures of the limit lookup and counter update.
    pub async fn record_spend(
        &self,
        user_id: &str,
        provider_id: &str,
        cost_usd: f64,
    ) -> Result<Vec<BudgetAlert>, DomainError> {
        if !cost_usd.is_finite() || cost_usd < 0.0 {
            return Err(DomainError::validation(format!(
                "Cost must be a non-negative amount, got {}",
                cost_usd
            )));
        }

        let Some(limit) = self.resolve_limit(user_id, Some(provider_id)).await? else {
            return Ok(Vec::new());
        };

        let now = self.clock.now();

        let Some(updated) = self.limits.add_spend(limit.id(), cost_usd, now).await? else {
            debug!(limit_id = %limit.id(), "Budget limit removed before spend was recorded");
            return Ok(Vec::new());
        };

        record_spend(provider_id, cost_usd);

        let mut created = Vec::new();

        for budget_type in [BudgetType::Monthly, BudgetType::Daily] {
            let Some(breach) = evaluate_threshold(
                budget_type,
                updated.period_spend(budget_type).unwrap_or_default(),
                updated.ceiling(budget_type),
                updated.warning_threshold_percent,
            ) else {
                continue;
            };

            let alert = breach.into_new_alert(user_id, updated.provider_id.as_deref());

            match self.create_budget_alert(alert).await {
                Ok(Some(alert)) => created.push(alert),
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        budget_type = %budget_type,
                        error = %e,
                        "Failed to create budget alert"
                    );
                    record_bookkeeping_failure("alert");
                }
            }
        }

        Ok(created)
    }
}

#[async_trait]
impl BudgetServiceTrait for BudgetService {
    async fn check_budget_before_chat(
        &self,
        user_id: &str,
        provider_id: Option<&str>,
        chat_id: Option<&str>,
    ) -> Result<Option<BudgetLimit>, DomainError> {
        let result = self.gate(user_id, provider_id, chat_id).await;

        if let Err(e) = &result {
            match e.as_budget_exceeded() {
                Some(exceeded) => {
                    info!(
                        user_id = %user_id,
                        provider_id = ?provider_id,
                        budget_type = %exceeded.budget_type,
                        spent = exceeded.spent,
                        limit = exceeded.limit,
                        "Budget gate blocked request"
                    );
                    record_gate_outcome("blocked", Some(exceeded.budget_type));
                }
                None => {
                    error!(user_id = %user_id, error = %e, "Budget gate failed");
                    record_gate_outcome("error", None);
                }
            }
        }

        result
    }

    async fn update_budget_spending(&self, user_id: &str, provider_id: &str, cost_usd: f64) {
        if let Err(e) = self.record_spend(user_id, provider_id, cost_usd).await {
            error!(
                user_id = %user_id,
                provider_id = %provider_id,
                cost_usd = cost_usd,
                error = %e,
                "Failed to record budget spending"
            );
            record_bookkeeping_failure("spend");
        }
    }

    async fn create_budget_alert(
        &self,
        alert: NewBudgetAlert,
    ) -> Result<Option<BudgetAlert>, DomainError> {
        let now = self.clock.now();
        let since = now - self.config.alert_dedup_window;

        let recent = self
            .alerts
            .find_recent(&alert.user_id, alert.alert_type, alert.budget_type, since)
            .await?;

        if let Some(existing) = recent {
            debug!(
                user_id = %alert.user_id,
                alert_type = %alert.alert_type,
                budget_type = %alert.budget_type,
                existing_id = %existing.id,
                "Suppressing duplicate budget alert"
            );
            record_alert_outcome(alert.alert_type, alert.budget_type, "suppressed");
            return Ok(None);
        }

        let stored = self.alerts.insert(alert.into_alert(now)).await?;

        info!(
            user_id = %stored.user_id,
            alert_type = %stored.alert_type,
            budget_type = %stored.budget_type,
            threshold_percent = stored.threshold_percent,
            "Budget alert created"
        );
        record_alert_outcome(stored.alert_type, stored.budget_type, "created");

        Ok(Some(stored))
    }

    async fn get_status(&self, user_id: &str) -> Result<BudgetStatusReport, DomainError> {
        let Some(limit) = self.limits.get_global(user_id).await? else {
            return Ok(BudgetStatusReport::no_budget());
        };

        let limit = self.apply_due_resets(limit, self.clock.now()).await;

        Ok(BudgetStatusReport::for_limit(limit))
    }

    async fn list_limits(&self, user_id: &str) -> Result<Vec<BudgetLimit>, DomainError> {
        self.limits.list_for_user(user_id).await
    }

    async fn save_limits(
        &self,
        user_id: &str,
        budgets: Vec<BudgetLimitSettings>,
    ) -> SaveLimitsOutcome {
        let mut outcome = SaveLimitsOutcome::default();

        for (index, settings) in budgets.into_iter().enumerate() {
            let saved = match settings.validate() {
                Ok(()) => {
                    self.limits
                        .upsert(user_id, &settings, self.clock.now())
                        .await
                }
                Err(e) => Err(e),
            };

            match saved {
                Ok(limit) => outcome.limits.push(limit),
                Err(e) => {
                    warn!(
                        user_id = %user_id,
                        index = index,
                        scope = %settings.scope(),
                        error = %e,
                        "Failed to save budget limit"
                    );
                    outcome.errors.push(SaveLimitError {
                        index,
                        provider_id: settings.scope().provider_id().map(str::to_string),
                        message: e.to_string(),
                    });
                }
            }
        }

        outcome
    }

    async fn delete_limits(&self, user_id: &str) -> Result<usize, DomainError> {
        let deleted = self.limits.delete_all(user_id).await?;
        info!(user_id = %user_id, deleted = deleted, "Deleted budget limits");
        Ok(deleted)
    }

    async fn delete_limit(&self, user_id: &str, id: &BudgetLimitId) -> Result<bool, DomainError> {
        self.limits.delete(user_id, id).await
    }

    async fn list_alerts(
        &self,
        user_id: &str,
        query: AlertQuery,
    ) -> Result<AlertPage, DomainError> {
        let query = AlertQuery {
            limit: query.limit.clamp(1, self.config.max_alert_page_size),
            ..query
        };

        let alerts = self.alerts.list(user_id, &query).await?;
        let total = self.alerts.count(user_id, query.unacknowledged_only).await?;

        Ok(AlertPage { alerts, total })
    }

    async fn acknowledge_alerts(
        &self,
        user_id: &str,
        alert_ids: &[String],
    ) -> Result<usize, DomainError> {
        if alert_ids.is_empty() {
            return Ok(0);
        }

        self.alerts.acknowledge(user_id, alert_ids).await
    }

    async fn ping(&self) -> Result<(), DomainError> {
        self.limits.ping().await
    }
}
