//! Model pricing used to cost a completed call from its token counts

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Price of one model, in USD per million tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub model_id: String,
    pub provider: String,
    pub input_per_million_usd: f64,
    pub output_per_million_usd: f64,
}

impl ModelPricing {
    pub fn new(
        model_id: impl Into<String>,
        provider: impl Into<String>,
        input_per_million_usd: f64,
        output_per_million_usd: f64,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            provider: provider.into(),
            input_per_million_usd,
            output_per_million_usd,
        }
    }

    /// Calculate cost in USD
    pub fn calculate_cost_usd(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (f64::from(input_tokens) * self.input_per_million_usd
            + f64::from(output_tokens) * self.output_per_million_usd)
            / 1_000_000.0
    }
}

/// Pricing lookup keyed by model ID
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    models: HashMap<String, ModelPricing>,
}

impl PricingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a model's pricing
    pub fn with_model(mut self, pricing: ModelPricing) -> Self {
        self.models.insert(pricing.model_id.clone(), pricing);
        self
    }

    /// Add or replace several models' pricing
    pub fn with_overrides(self, overrides: impl IntoIterator<Item = ModelPricing>) -> Self {
        overrides.into_iter().fold(self, Self::with_model)
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelPricing> {
        self.models.get(model_id)
    }

    /// Cost of a call, or `None` if the model is not priced
    pub fn cost_usd(&self, model_id: &str, input_tokens: u32, output_tokens: u32) -> Option<f64> {
        self.get(model_id)
            .map(|p| p.calculate_cost_usd(input_tokens, output_tokens))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Default pricing for common models
pub fn default_pricing_table() -> PricingTable {
    PricingTable::new()
        .with_model(ModelPricing::new("gpt-4o", "openai", 2.5, 10.0))
        .with_model(ModelPricing::new("gpt-4o-mini", "openai", 0.15, 0.6))
        .with_model(ModelPricing::new("gpt-4-turbo", "openai", 10.0, 30.0))
        .with_model(ModelPricing::new("o1", "openai", 15.0, 60.0))
        .with_model(ModelPricing::new("o3-mini", "openai", 1.1, 4.4))
        .with_model(ModelPricing::new("claude-3-5-sonnet-20241022", "anthropic", 3.0, 15.0))
        .with_model(ModelPricing::new("claude-3-5-haiku-20241022", "anthropic", 0.8, 4.0))
        .with_model(ModelPricing::new("claude-3-opus-20240229", "anthropic", 15.0, 75.0))
        .with_model(ModelPricing::new("gemini-1.5-pro", "google", 1.25, 5.0))
        .with_model(ModelPricing::new("gemini-1.5-flash", "google", 0.075, 0.3))
        .with_model(ModelPricing::new("mistral-large-latest", "mistral", 2.0, 6.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_cost() {
        let pricing = ModelPricing::new("gpt-4o", "openai", 2.5, 10.0);

        // 1M input + 500K output = 2.5 + 5.0
        let cost = pricing.calculate_cost_usd(1_000_000, 500_000);
        assert!((cost - 7.5).abs() < 1e-9);

        let cost = pricing.calculate_cost_usd(1_000, 200);
        assert!((cost - 0.0045).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_model_has_no_cost() {
        let table = default_pricing_table();

        assert!(table.cost_usd("gpt-4o-mini", 10, 10).is_some());
        assert!(table.cost_usd("my-local-model", 10, 10).is_none());
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let table = default_pricing_table()
            .with_overrides(vec![ModelPricing::new("gpt-4o", "openai", 1.0, 1.0)]);

        let cost = table.cost_usd("gpt-4o", 1_000_000, 0).unwrap();
        assert!((cost - 1.0).abs() < 1e-9);
        assert!(table.get("claude-3-opus-20240229").is_some());
    }
}
