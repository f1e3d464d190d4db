//! Application state for shared services

use std::sync::Arc;

use crate::domain::budget::DEFAULT_WARNING_THRESHOLD_PERCENT;
use crate::infrastructure::auth::SessionValidator;
use crate::infrastructure::budget::BudgetServiceTrait;
use crate::infrastructure::usage::UsageTrackingServiceTrait;

/// Budget settings the HTTP layer needs
#[derive(Debug, Clone)]
pub struct BudgetApiSettings {
    /// Quoted in budget exceeded errors
    pub settings_url: String,
    /// Applied to saved limits that omit a threshold
    pub default_warning_threshold_percent: u8,
}

impl Default for BudgetApiSettings {
    fn default() -> Self {
        Self {
            settings_url: "/settings/budget".to_string(),
            default_warning_threshold_percent: DEFAULT_WARNING_THRESHOLD_PERCENT,
        }
    }
}

/// Application state containing shared services using dynamic dispatch
#[derive(Clone)]
pub struct AppState {
    pub budget_service: Arc<dyn BudgetServiceTrait>,
    pub usage_service: Arc<dyn UsageTrackingServiceTrait>,
    pub session_validator: Arc<dyn SessionValidator>,
    pub budget_settings: Arc<BudgetApiSettings>,
}

impl AppState {
    pub fn new(
        budget_service: Arc<dyn BudgetServiceTrait>,
        usage_service: Arc<dyn UsageTrackingServiceTrait>,
        session_validator: Arc<dyn SessionValidator>,
    ) -> Self {
        Self {
            budget_service,
            usage_service,
            session_validator,
            budget_settings: Arc::new(BudgetApiSettings::default()),
        }
    }

    pub fn with_budget_settings(mut self, settings: BudgetApiSettings) -> Self {
        self.budget_settings = Arc::new(settings);
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("budget_service", &self.budget_service)
            .field("usage_service", &self.usage_service)
            .field("budget_settings", &self.budget_settings)
            .finish_non_exhaustive()
    }
}
