//! Per-user spending budgets
//!
//! Limits are stored per (user, provider-or-global) scope. The gate checks a
//! resolved limit before a priced call, the recorder adds spend after it and
//! raises threshold alerts, and both share the calendar reset rules.

mod alert;
mod error;
mod limit;
mod period;
mod repository;
mod scope;
mod status;
mod threshold;

pub use alert::{
    AlertPage, AlertQuery, AlertType, BudgetAlert, BudgetAlertId, BudgetType, NewBudgetAlert,
};
pub use error::BudgetExceeded;
pub use limit::{
    BudgetLimit, BudgetLimitId, BudgetLimitSettings, BudgetScope, DEFAULT_WARNING_THRESHOLD_PERCENT,
};
pub use period::{is_day_reset_due, is_month_reset_due, start_of_day, start_of_month, ResetPlan};
pub use repository::{BudgetAlertRepository, BudgetLimitRepository};
pub use scope::ScopedBudgetLimits;
pub use status::{BudgetStatusReport, BudgetStatusSnapshot, PeriodStatus};
pub use threshold::{evaluate_threshold, ThresholdBreach};

#[cfg(test)]
pub use repository::MockBudgetAlertRepository;
