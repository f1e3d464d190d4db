//! Domain layer - Core business logic and entities

pub mod budget;
pub mod clock;
pub mod error;
pub mod usage;

pub use budget::{
    AlertType, BudgetAlert, BudgetExceeded, BudgetLimit, BudgetLimitId, BudgetLimitSettings,
    BudgetScope, BudgetType,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::DomainError;
pub use usage::{UsageRecord, UsageRecordId};
