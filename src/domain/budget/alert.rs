//! Budget alert entities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Budget alert identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BudgetAlertId(String);

impl BudgetAlertId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BudgetAlertId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for BudgetAlertId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of budget notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Spend crossed the warning threshold
    Warning,
    /// Spend reached the ceiling
    LimitReached,
    /// Spend went past the ceiling
    BudgetExceeded,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::LimitReached => "limit_reached",
            Self::BudgetExceeded => "budget_exceeded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "warning" => Some(Self::Warning),
            "limit_reached" => Some(Self::LimitReached),
            "budget_exceeded" => Some(Self::BudgetExceeded),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which ceiling a check or alert concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetType {
    Monthly,
    Daily,
    PerChat,
}

impl BudgetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Daily => "daily",
            Self::PerChat => "per_chat",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "monthly" => Some(Self::Monthly),
            "daily" => Some(Self::Daily),
            "per_chat" => Some(Self::PerChat),
            _ => None,
        }
    }

    /// Human label used in user-facing messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Monthly => "Monthly",
            Self::Daily => "Daily",
            Self::PerChat => "Per-chat",
        }
    }
}

impl std::fmt::Display for BudgetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert about to be raised, before deduplication and storage
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudgetAlert {
    pub user_id: String,
    pub alert_type: AlertType,
    pub budget_type: BudgetType,
    pub threshold_percent: u8,
    pub amount_spent: f64,
    pub budget_limit: f64,
    pub message: String,
}

impl NewBudgetAlert {
    /// Stamp the alert for storage
    pub fn into_alert(self, now: DateTime<Utc>) -> BudgetAlert {
        BudgetAlert {
            id: BudgetAlertId::generate(),
            user_id: self.user_id,
            alert_type: self.alert_type,
            budget_type: self.budget_type,
            threshold_percent: self.threshold_percent,
            amount_spent: self.amount_spent,
            budget_limit: self.budget_limit,
            message: self.message,
            acknowledged: false,
            created_at: now,
        }
    }
}

/// A stored, user-visible budget notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetAlert {
    pub id: BudgetAlertId,
    pub user_id: String,
    pub alert_type: AlertType,
    pub budget_type: BudgetType,
    pub threshold_percent: u8,
    pub amount_spent: f64,
    pub budget_limit: f64,
    pub message: String,
    pub acknowledged: bool,
    pub created_at: DateTime<Utc>,
}

/// Pagination and filtering for alert listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertQuery {
    pub limit: usize,
    pub offset: usize,
    pub unacknowledged_only: bool,
}

impl Default for AlertQuery {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
            unacknowledged_only: false,
        }
    }
}

/// One page of alerts plus the total matching the filter
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPage {
    pub alerts: Vec<BudgetAlert>,
    pub total: usize,
}
