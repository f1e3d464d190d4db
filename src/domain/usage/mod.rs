//! Usage tracking domain
//!
//! Records the cost of each completed provider call. The per-chat budget
//! ceiling is checked against the sum of these records.

mod pricing;
mod record;
mod repository;

pub use pricing::{default_pricing_table, ModelPricing, PricingTable};
pub use record::{UsageRecord, UsageRecordId};
pub use repository::UsageRecordRepository;

#[cfg(test)]
pub use repository::MockUsageRecordRepository;
