//! Budget limit entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::BudgetType;
use crate::domain::DomainError;

/// Warning threshold applied when a limit is saved without one
pub const DEFAULT_WARNING_THRESHOLD_PERCENT: u8 = 80;

/// Budget limit identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetLimitId(String);

impl BudgetLimitId {
    /// Create a budget limit ID from an existing value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for BudgetLimitId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for BudgetLimitId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for BudgetLimitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a limit row applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BudgetScope {
    /// Fallback for every provider without its own row
    Global,
    /// A single provider
    Provider(String),
}

impl BudgetScope {
    /// Build a scope from an optional provider ID; blank IDs mean global
    pub fn from_provider(provider_id: Option<&str>) -> Self {
        match provider_id.map(str::trim) {
            Some(id) if !id.is_empty() => Self::Provider(id.to_string()),
            _ => Self::Global,
        }
    }

    pub fn provider_id(&self) -> Option<&str> {
        match self {
            Self::Global => None,
            Self::Provider(id) => Some(id),
        }
    }
}

impl std::fmt::Display for BudgetScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Provider(id) => write!(f, "provider:{}", id),
        }
    }
}

/// User-editable part of a budget limit, as saved from the settings page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLimitSettings {
    pub provider_id: Option<String>,
    pub monthly_budget_usd: Option<f64>,
    pub daily_budget_usd: Option<f64>,
    pub per_chat_budget_usd: Option<f64>,
    pub warning_threshold_percent: u8,
    pub enforce_limits: bool,
    pub email_notifications: bool,
    pub in_app_notifications: bool,
}

impl BudgetLimitSettings {
    /// Settings for the given scope with no ceilings configured
    pub fn new(scope: BudgetScope) -> Self {
        Self {
            provider_id: scope.provider_id().map(str::to_string),
            monthly_budget_usd: None,
            daily_budget_usd: None,
            per_chat_budget_usd: None,
            warning_threshold_percent: DEFAULT_WARNING_THRESHOLD_PERCENT,
            enforce_limits: true,
            email_notifications: false,
            in_app_notifications: true,
        }
    }

    pub fn with_monthly(mut self, usd: f64) -> Self {
        self.monthly_budget_usd = Some(usd);
        self
    }

    pub fn with_daily(mut self, usd: f64) -> Self {
        self.daily_budget_usd = Some(usd);
        self
    }

    pub fn with_per_chat(mut self, usd: f64) -> Self {
        self.per_chat_budget_usd = Some(usd);
        self
    }

    pub fn with_warning_threshold(mut self, percent: u8) -> Self {
        self.warning_threshold_percent = percent;
        self
    }

    pub fn with_enforcement(mut self, enforce: bool) -> Self {
        self.enforce_limits = enforce;
        self
    }

    pub fn scope(&self) -> BudgetScope {
        BudgetScope::from_provider(self.provider_id.as_deref())
    }

    /// Check ceilings and threshold are within range
    pub fn validate(&self) -> Result<(), DomainError> {
        let ceilings = [
            ("monthlyBudgetUsd", self.monthly_budget_usd),
            ("dailyBudgetUsd", self.daily_budget_usd),
            ("perChatBudgetUsd", self.per_chat_budget_usd),
        ];

        for (field, value) in ceilings {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(DomainError::validation(format!(
                        "{} must be a non-negative amount, got {}",
                        field, v
                    )));
                }
            }
        }

        if self.warning_threshold_percent > 100 {
            return Err(DomainError::validation(format!(
                "warningThresholdPercent must be between 0 and 100, got {}",
                self.warning_threshold_percent
            )));
        }

        if let Some(provider) = &self.provider_id {
            if provider.len() > 100 {
                return Err(DomainError::validation(
                    "providerId must be at most 100 characters",
                ));
            }
        }

        Ok(())
    }
}

/// Spending ceilings and running totals for one (user, provider-or-global) scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLimit {
    id: BudgetLimitId,
    pub user_id: String,
    /// `None` marks the global row
    pub provider_id: Option<String>,
    /// `None` = unconstrained, `0` = blocked
    pub monthly_budget_usd: Option<f64>,
    pub daily_budget_usd: Option<f64>,
    pub per_chat_budget_usd: Option<f64>,
    pub current_month_spend: f64,
    pub current_day_spend: f64,
    pub month_reset: Option<DateTime<Utc>>,
    pub day_reset: Option<DateTime<Utc>>,
    pub warning_threshold_percent: u8,
    pub enforce_limits: bool,
    pub email_notifications: bool,
    pub in_app_notifications: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BudgetLimit {
    /// Create a fresh limit row from settings, with zeroed counters and no reset stamps
    pub fn new(
        id: impl Into<BudgetLimitId>,
        user_id: impl Into<String>,
        settings: &BudgetLimitSettings,
        now: DateTime<Utc>,
    ) -> Self {
        let mut limit = Self {
            id: id.into(),
            user_id: user_id.into(),
            provider_id: None,
            monthly_budget_usd: None,
            daily_budget_usd: None,
            per_chat_budget_usd: None,
            current_month_spend: 0.0,
            current_day_spend: 0.0,
            month_reset: None,
            day_reset: None,
            warning_threshold_percent: DEFAULT_WARNING_THRESHOLD_PERCENT,
            enforce_limits: true,
            email_notifications: false,
            in_app_notifications: true,
            created_at: now,
            updated_at: now,
        };

        limit.apply_settings(settings, now);
        limit
    }

    /// Overwrite the user-editable fields, leaving counters and stamps alone
    pub fn apply_settings(&mut self, settings: &BudgetLimitSettings, now: DateTime<Utc>) {
        self.provider_id = settings.scope().provider_id().map(str::to_string);
        self.monthly_budget_usd = settings.monthly_budget_usd;
        self.daily_budget_usd = settings.daily_budget_usd;
        self.per_chat_budget_usd = settings.per_chat_budget_usd;
        self.warning_threshold_percent = settings.warning_threshold_percent;
        self.enforce_limits = settings.enforce_limits;
        self.email_notifications = settings.email_notifications;
        self.in_app_notifications = settings.in_app_notifications;
        self.updated_at = now;
    }

    /// Restore counters and stamps when loading from storage
    pub fn with_counters(
        mut self,
        current_month_spend: f64,
        current_day_spend: f64,
        month_reset: Option<DateTime<Utc>>,
        day_reset: Option<DateTime<Utc>>,
    ) -> Self {
        self.current_month_spend = current_month_spend;
        self.current_day_spend = current_day_spend;
        self.month_reset = month_reset;
        self.day_reset = day_reset;
        self
    }

    pub fn id(&self) -> &BudgetLimitId {
        &self.id
    }

    pub fn scope(&self) -> BudgetScope {
        BudgetScope::from_provider(self.provider_id.as_deref())
    }

    pub fn is_global(&self) -> bool {
        self.provider_id.is_none()
    }

    /// Configured ceiling for a budget type
    pub fn ceiling(&self, budget_type: BudgetType) -> Option<f64> {
        match budget_type {
            BudgetType::Monthly => self.monthly_budget_usd,
            BudgetType::Daily => self.daily_budget_usd,
            BudgetType::PerChat => self.per_chat_budget_usd,
        }
    }

    /// Running total for a period; per-chat spend is not tracked on the row
    pub fn period_spend(&self, budget_type: BudgetType) -> Option<f64> {
        match budget_type {
            BudgetType::Monthly => Some(self.current_month_spend),
            BudgetType::Daily => Some(self.current_day_spend),
            BudgetType::PerChat => None,
        }
    }

    /// Add spend to both running totals.
    ///
    /// Missing reset stamps are set to `now`, so the spend counts toward the
    /// current period instead of being zeroed by the next reset check.
    pub fn add_spend(&mut self, cost_usd: f64, now: DateTime<Utc>) {
        self.day_reset.get_or_insert(now);
        self.month_reset.get_or_insert(now);
        self.current_day_spend += cost_usd;
        self.current_month_spend += cost_usd;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_scope_from_provider() {
        assert_eq!(BudgetScope::from_provider(None), BudgetScope::Global);
        assert_eq!(BudgetScope::from_provider(Some("  ")), BudgetScope::Global);
        assert_eq!(
            BudgetScope::from_provider(Some("openai")),
            BudgetScope::Provider("openai".to_string())
        );
        assert_eq!(BudgetScope::Provider("openai".into()).to_string(), "provider:openai");
    }

    #[test]
    fn test_new_limit_from_settings() {
        let settings = BudgetLimitSettings::new(BudgetScope::Provider("openai".into()))
            .with_monthly(10.0)
            .with_daily(2.0)
            .with_warning_threshold(75);

        let limit = BudgetLimit::new("limit-1", "user-1", &settings, now());

        assert_eq!(limit.id().as_str(), "limit-1");
        assert_eq!(limit.provider_id.as_deref(), Some("openai"));
        assert_eq!(limit.monthly_budget_usd, Some(10.0));
        assert_eq!(limit.daily_budget_usd, Some(2.0));
        assert_eq!(limit.per_chat_budget_usd, None);
        assert_eq!(limit.warning_threshold_percent, 75);
        assert_eq!(limit.current_day_spend, 0.0);
        assert!(limit.day_reset.is_none());
        assert!(limit.month_reset.is_none());
    }

    #[test]
    fn test_apply_settings_keeps_counters() {
        let settings = BudgetLimitSettings::new(BudgetScope::Global).with_monthly(100.0);
        let mut limit = BudgetLimit::new("limit-1", "user-1", &settings, now())
            .with_counters(40.0, 5.0, Some(now()), Some(now()));

        limit.apply_settings(&settings.clone().with_monthly(50.0), now());

        assert_eq!(limit.monthly_budget_usd, Some(50.0));
        assert_eq!(limit.current_month_spend, 40.0);
        assert_eq!(limit.current_day_spend, 5.0);
        assert!(limit.is_global());
    }

    #[test]
    fn test_settings_validation() {
        assert!(BudgetLimitSettings::new(BudgetScope::Global)
            .with_monthly(0.0)
            .validate()
            .is_ok());

        assert!(BudgetLimitSettings::new(BudgetScope::Global)
            .with_daily(-1.0)
            .validate()
            .is_err());

        assert!(BudgetLimitSettings::new(BudgetScope::Global)
            .with_per_chat(f64::NAN)
            .validate()
            .is_err());

        assert!(BudgetLimitSettings::new(BudgetScope::Global)
            .with_warning_threshold(101)
            .validate()
            .is_err());
    }

    #[test]
    fn test_add_spend_stamps_missing_resets() {
        let settings = BudgetLimitSettings::new(BudgetScope::Global).with_daily(5.0);
        let mut limit = BudgetLimit::new("limit-1", "user-1", &settings, now());
        assert_eq!(limit.day_reset, None);

        let later = now() + chrono::Duration::hours(2);
        limit.add_spend(6.0, later);

        assert_eq!(limit.current_day_spend, 6.0);
        assert_eq!(limit.day_reset, Some(later));
        assert_eq!(limit.month_reset, Some(later));

        let stamped = limit.day_reset;
        limit.add_spend(1.0, later + chrono::Duration::hours(1));
        assert_eq!(limit.day_reset, stamped);
        assert_eq!(limit.current_month_spend, 7.0);
    }

    #[test]
    fn test_limit_serializes_camel_case() {
        let settings = BudgetLimitSettings::new(BudgetScope::Global).with_monthly(20.0);
        let limit = BudgetLimit::new("limit-1", "user-1", &settings, now());
        let json = serde_json::to_value(&limit).unwrap();

        assert_eq!(json["id"], "limit-1");
        assert_eq!(json["userId"], "user-1");
        assert!(json["providerId"].is_null());
        assert_eq!(json["monthlyBudgetUsd"], 20.0);
        assert_eq!(json["currentDaySpend"], 0.0);
        assert_eq!(json["warningThresholdPercent"], 80);
    }
}
