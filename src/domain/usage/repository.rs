//! Usage repository trait

use async_trait::async_trait;

use super::UsageRecord;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository for usage records
#[cfg_attr(test, automock)]
#[async_trait]
pub trait UsageRecordRepository: Send + Sync {
    /// Record a usage event
    async fn record(&self, record: UsageRecord) -> Result<UsageRecord, DomainError>;

    /// Total cost of every record of the user for this exact chat
    async fn sum_cost_for_chat(&self, user_id: &str, chat_id: &str) -> Result<f64, DomainError>;
}
