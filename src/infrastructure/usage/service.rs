//! Usage recording service

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::usage::{PricingTable, UsageRecord, UsageRecordId, UsageRecordRepository};
use crate::domain::{Clock, DomainError};
use crate::infrastructure::budget::BudgetServiceTrait;

/// Parameters for recording usage
#[derive(Debug, Clone)]
pub struct RecordUsageParams {
    pub user_id: String,
    pub provider_id: String,
    pub model_id: String,
    pub chat_id: Option<String>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    /// Explicit cost; priced from the model table when absent
    pub cost_usd: Option<f64>,
}

impl RecordUsageParams {
    pub fn new(
        user_id: impl Into<String>,
        provider_id: impl Into<String>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            provider_id: provider_id.into(),
            model_id: model_id.into(),
            chat_id: None,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: None,
        }
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    pub fn with_tokens(mut self, input: u32, output: u32) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = Some(cost_usd);
        self
    }

    fn validate(&self) -> Result<(), DomainError> {
        if self.provider_id.trim().is_empty() {
            return Err(DomainError::validation("Provider ID is required"));
        }

        if self.model_id.trim().is_empty() {
            return Err(DomainError::validation("Model ID is required"));
        }

        if let Some(cost) = self.cost_usd {
            if !cost.is_finite() || cost < 0.0 {
                return Err(DomainError::validation(format!(
                    "Cost must be a non-negative amount, got {}",
                    cost
                )));
            }
        }

        Ok(())
    }
}

/// Trait for usage tracking service
#[async_trait]
pub trait UsageTrackingServiceTrait: Send + Sync + Debug {
    /// Store a usage record, then post its cost to the user's budget
    async fn record(&self, params: RecordUsageParams) -> Result<UsageRecord, DomainError>;

    /// Cost of a call from the pricing table; unknown models cost nothing
    fn calculate_cost(&self, model_id: &str, input_tokens: u32, output_tokens: u32) -> f64;
}

/// Usage tracking service implementation
pub struct UsageTrackingService {
    repository: Arc<dyn UsageRecordRepository>,
    budget: Arc<dyn BudgetServiceTrait>,
    pricing: PricingTable,
    clock: Arc<dyn Clock>,
}

impl Debug for UsageTrackingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UsageTrackingService")
            .field("budget", &self.budget)
            .field("priced_models", &self.pricing.len())
            .finish_non_exhaustive()
    }
}

impl UsageTrackingService {
    pub fn new(
        repository: Arc<dyn UsageRecordRepository>,
        budget: Arc<dyn BudgetServiceTrait>,
        pricing: PricingTable,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            budget,
            pricing,
            clock,
        }
    }
}

#[async_trait]
impl UsageTrackingServiceTrait for UsageTrackingService {
    async fn record(&self, params: RecordUsageParams) -> Result<UsageRecord, DomainError> {
        params.validate()?;

        let cost = match params.cost_usd {
            Some(cost) => cost,
            None => self.calculate_cost(&params.model_id, params.input_tokens, params.output_tokens),
        };

        let mut record = UsageRecord::new(
            UsageRecordId::generate(),
            params.user_id,
            params.provider_id,
            params.model_id,
            self.clock.now(),
        )
        .with_tokens(params.input_tokens, params.output_tokens)
        .with_cost(cost);

        if let Some(chat_id) = params.chat_id {
            record = record.with_chat_id(chat_id);
        }

        let record = self.repository.record(record).await?;

        debug!(
            user_id = %record.user_id,
            provider_id = %record.provider_id,
            model_id = %record.model_id,
            cost_usd = record.cost_usd,
            "Usage recorded"
        );

        self.budget
            .update_budget_spending(&record.user_id, &record.provider_id, record.cost_usd)
            .await;

        Ok(record)
    }

    fn calculate_cost(&self, model_id: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        match self.pricing.cost_usd(model_id, input_tokens, output_tokens) {
            Some(cost) => cost,
            None => {
                warn!(model_id = %model_id, "No pricing for model, recording zero cost");
                0.0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::budget::{BudgetLimitSettings, BudgetScope};
    use crate::domain::usage::{default_pricing_table, ModelPricing};
    use crate::domain::ManualClock;
    use crate::infrastructure::budget::{
        BudgetService, InMemoryBudgetAlertRepository, InMemoryBudgetLimitRepository,
    };
    use crate::infrastructure::usage::InMemoryUsageRecordRepository;
    use chrono::{TimeZone, Utc};

    const USER: &str = "user-1";

    struct Harness {
        budget: Arc<BudgetService>,
        usage: Arc<InMemoryUsageRecordRepository>,
        service: UsageTrackingService,
    }

    fn harness(pricing: PricingTable) -> Harness {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2024, 6, 15, 10, 0, 0).unwrap(),
        ));
        let usage = Arc::new(InMemoryUsageRecordRepository::new());
        let budget = Arc::new(BudgetService::new(
            Arc::new(InMemoryBudgetLimitRepository::new()),
            Arc::new(InMemoryBudgetAlertRepository::new()),
            usage.clone(),
            clock.clone(),
        ));
        let service = UsageTrackingService::new(usage.clone(), budget.clone(), pricing, clock);

        Harness {
            budget,
            usage,
            service,
        }
    }

    async fn global_limit(h: &Harness, monthly: f64) {
        let settings = BudgetLimitSettings::new(BudgetScope::Global).with_monthly(monthly);
        let outcome = h.budget.save_limits(USER, vec![settings]).await;
        assert!(outcome.errors.is_empty());
        h.budget
            .check_budget_before_chat(USER, Some("openai"), None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_record_posts_explicit_cost_to_budget() {
        let h = harness(default_pricing_table());
        global_limit(&h, 10.0).await;

        let record = h
            .service
            .record(
                RecordUsageParams::new(USER, "openai", "gpt-4o")
                    .with_tokens(100, 50)
                    .with_chat_id("chat-1")
                    .with_cost(2.0),
            )
            .await
            .unwrap();

        assert_eq!(record.cost_usd, 2.0);
        assert_eq!(record.chat_id.as_deref(), Some("chat-1"));

        let limits = h.budget.list_limits(USER).await.unwrap();
        assert_eq!(limits[0].current_month_spend, 2.0);
        assert_eq!(limits[0].current_day_spend, 2.0);

        let chat_total = h.usage.sum_cost_for_chat(USER, "chat-1").await.unwrap();
        assert_eq!(chat_total, 2.0);
    }

    #[tokio::test]
    async fn test_record_prices_from_table() {
        let pricing = PricingTable::new().with_model(ModelPricing::new("m-1", "openai", 2.0, 8.0));
        let h = harness(pricing);
        global_limit(&h, 100.0).await;

        let record = h
            .service
            .record(RecordUsageParams::new(USER, "openai", "m-1").with_tokens(500_000, 250_000))
            .await
            .unwrap();

        assert!((record.cost_usd - 3.0).abs() < 1e-9);

        let limits = h.budget.list_limits(USER).await.unwrap();
        assert!((limits[0].current_month_spend - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_unknown_model_costs_nothing() {
        let h = harness(PricingTable::new());

        assert_eq!(h.service.calculate_cost("mystery", 1_000, 1_000), 0.0);

        let record = h
            .service
            .record(RecordUsageParams::new(USER, "openai", "mystery").with_tokens(10, 10))
            .await
            .unwrap();
        assert_eq!(record.cost_usd, 0.0);
    }

    #[tokio::test]
    async fn test_invalid_params_record_nothing() {
        let h = harness(default_pricing_table());

        let negative = h
            .service
            .record(RecordUsageParams::new(USER, "openai", "gpt-4o").with_cost(-1.0))
            .await;
        assert!(matches!(negative, Err(DomainError::Validation { .. })));

        let blank = h
            .service
            .record(RecordUsageParams::new(USER, " ", "gpt-4o"))
            .await;
        assert!(matches!(blank, Err(DomainError::Validation { .. })));

        assert_eq!(h.usage.len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_record_without_budget_still_stores_usage() {
        let h = harness(default_pricing_table());

        h.service
            .record(RecordUsageParams::new(USER, "anthropic", "x").with_cost(1.5))
            .await
            .unwrap();

        assert_eq!(h.usage.len().unwrap(), 1);
        assert!(h.budget.list_limits(USER).await.unwrap().is_empty());
    }
}
