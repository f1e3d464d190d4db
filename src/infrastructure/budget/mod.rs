//! Budget infrastructure - repositories and the budget service

mod in_memory;
mod postgres;
mod service;

pub use in_memory::{InMemoryBudgetAlertRepository, InMemoryBudgetLimitRepository};
pub use postgres::{PostgresBudgetAlertRepository, PostgresBudgetLimitRepository};
pub use service::{
    BudgetService, BudgetServiceConfig, BudgetServiceTrait, SaveLimitError, SaveLimitsOutcome,
};
