//! Usage record entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a usage record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageRecordId(String);

impl UsageRecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UsageRecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for UsageRecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cost of one completed, priced provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    id: UsageRecordId,
    pub user_id: String,
    pub provider_id: String,
    pub model_id: String,
    /// Conversation the call belonged to, if any
    pub chat_id: Option<String>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn new(
        id: impl Into<UsageRecordId>,
        user_id: impl Into<String>,
        provider_id: impl Into<String>,
        model_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            provider_id: provider_id.into(),
            model_id: model_id.into(),
            chat_id: None,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            created_at: now,
        }
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    /// Set token counts
    pub fn with_tokens(mut self, input: u32, output: u32) -> Self {
        self.input_tokens = input;
        self.output_tokens = output;
        self
    }

    /// Set the cost in dollars
    pub fn with_cost(mut self, cost_usd: f64) -> Self {
        self.cost_usd = cost_usd;
        self
    }

    pub fn id(&self) -> &UsageRecordId {
        &self.id
    }

    pub fn total_tokens(&self) -> u64 {
        u64::from(self.input_tokens) + u64::from(self.output_tokens)
    }
}

impl From<&str> for UsageRecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
