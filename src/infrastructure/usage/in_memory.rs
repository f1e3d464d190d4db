//! In-memory usage record repository

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::usage::{UsageRecord, UsageRecordRepository};
use crate::domain::DomainError;

#[derive(Debug, Default)]
struct UsageStore {
    records: VecDeque<UsageRecord>,
    /// Running cost per (user, chat); never evicted
    chat_totals: HashMap<(String, String), f64>,
}

/// In-memory usage repository
///
/// Raw records are capped and dropped oldest-first, while per-chat totals are
/// kept for the lifetime of the repository so chat ceilings stay accurate.
#[derive(Debug)]
pub struct InMemoryUsageRecordRepository {
    store: RwLock<UsageStore>,
    max_records: usize,
}

impl InMemoryUsageRecordRepository {
    /// Create a repository holding the default number of records
    pub fn new() -> Self {
        Self::with_capacity(100_000)
    }

    /// Create a repository that keeps at most `max_records` raw records
    pub fn with_capacity(max_records: usize) -> Self {
        Self {
            store: RwLock::new(UsageStore::default()),
            max_records,
        }
    }

    /// Number of raw records currently held
    pub fn len(&self) -> Result<usize, DomainError> {
        let store = self.store.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(store.records.len())
    }
}

impl Default for InMemoryUsageRecordRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UsageRecordRepository for InMemoryUsageRecordRepository {
    async fn record(&self, record: UsageRecord) -> Result<UsageRecord, DomainError> {
        let mut store = self.store.write().map_err(|e| {
            DomainError::internal(format!("Failed to acquire write lock: {}", e))
        })?;

        if let Some(chat_id) = &record.chat_id {
            *store
                .chat_totals
                .entry((record.user_id.clone(), chat_id.clone()))
                .or_insert(0.0) += record.cost_usd;
        }

        store.records.push_back(record.clone());
        while store.records.len() > self.max_records {
            store.records.pop_front();
        }

        Ok(record)
    }

    async fn sum_cost_for_chat(&self, user_id: &str, chat_id: &str) -> Result<f64, DomainError> {
        let store = self.store.read().map_err(|e| {
            DomainError::internal(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(store
            .chat_totals
            .get(&(user_id.to_string(), chat_id.to_string()))
            .copied()
            .unwrap_or(0.0))
    }
}
