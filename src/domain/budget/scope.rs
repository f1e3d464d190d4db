//! Provider-specific limits with fallback to the user's global limit

use std::collections::HashMap;

use super::{BudgetLimit, BudgetScope};

/// A user's limit rows keyed by scope
#[derive(Debug, Clone, Default)]
pub struct ScopedBudgetLimits {
    global: Option<BudgetLimit>,
    by_provider: HashMap<String, BudgetLimit>,
}

impl ScopedBudgetLimits {
    pub fn from_limits(limits: impl IntoIterator<Item = BudgetLimit>) -> Self {
        let mut scoped = Self::default();

        for limit in limits {
            match limit.scope() {
                BudgetScope::Global => scoped.global = Some(limit),
                BudgetScope::Provider(provider) => {
                    scoped.by_provider.insert(provider, limit);
                }
            }
        }

        scoped
    }

    /// The row that governs `provider_id`: its own row if present, else the global row
    pub fn into_resolved(mut self, provider_id: Option<&str>) -> Option<BudgetLimit> {
        let own = match BudgetScope::from_provider(provider_id) {
            BudgetScope::Provider(provider) => self.by_provider.remove(&provider),
            BudgetScope::Global => None,
        };

        own.or(self.global)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::budget::BudgetLimitSettings;
    use chrono::Utc;

    fn limit(id: &str, scope: BudgetScope, monthly: f64) -> BudgetLimit {
        let settings = BudgetLimitSettings::new(scope).with_monthly(monthly);
        BudgetLimit::new(id, "user-1", &settings, Utc::now())
    }

    fn resolved_id(scoped: &ScopedBudgetLimits, provider_id: Option<&str>) -> Option<String> {
        scoped
            .clone()
            .into_resolved(provider_id)
            .map(|limit| limit.id().as_str().to_string())
    }

    #[test]
    fn test_empty_resolves_to_nothing() {
        let scoped = ScopedBudgetLimits::from_limits(Vec::new());

        assert_eq!(resolved_id(&scoped, Some("openai")), None);
        assert_eq!(resolved_id(&scoped, None), None);
    }

    #[test]
    fn test_provider_row_overrides_global() {
        let scoped = ScopedBudgetLimits::from_limits(vec![
            limit("global", BudgetScope::Global, 100.0),
            limit("openai", BudgetScope::Provider("openai".into()), 10.0),
        ]);

        assert_eq!(resolved_id(&scoped, Some("openai")).as_deref(), Some("openai"));
        assert_eq!(resolved_id(&scoped, Some("anthropic")).as_deref(), Some("global"));
        assert_eq!(resolved_id(&scoped, None).as_deref(), Some("global"));
    }

    #[test]
    fn test_provider_row_without_global() {
        let scoped = ScopedBudgetLimits::from_limits(vec![limit(
            "openai",
            BudgetScope::Provider("openai".into()),
            10.0,
        )]);

        assert_eq!(resolved_id(&scoped, Some("anthropic")), None);
        assert_eq!(resolved_id(&scoped, None), None);
        assert_eq!(
            scoped.into_resolved(Some("openai")).unwrap().monthly_budget_usd,
            Some(10.0)
        );
    }
}
