//! Dashboard projection of a budget limit

use serde::Serialize;

use super::{BudgetLimit, BudgetType};

/// Spend against one period's ceiling
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodStatus {
    pub spent: f64,
    pub limit: Option<f64>,
    /// Two-decimal percentage; not capped at 100
    pub percentage: f64,
    pub is_warning: bool,
    pub is_exceeded: bool,
}

impl PeriodStatus {
    pub fn project(spent: f64, limit: Option<f64>, warning_threshold_percent: u8) -> Self {
        let percentage = match limit {
            None => 0.0,
            Some(l) if l == 0.0 => 100.0,
            Some(l) => (spent / l * 10_000.0).round() / 100.0,
        };

        let is_exceeded = limit.is_some() && percentage >= 100.0;
        let is_warning =
            limit.is_some() && !is_exceeded && percentage >= f64::from(warning_threshold_percent);

        Self {
            spent,
            limit,
            percentage,
            is_warning,
            is_exceeded,
        }
    }
}

/// Monthly and daily projections for a limit row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetStatusSnapshot {
    pub monthly: PeriodStatus,
    pub daily: PeriodStatus,
}

impl BudgetStatusSnapshot {
    pub fn from_limit(limit: &BudgetLimit) -> Self {
        let project = |budget_type: BudgetType| {
            PeriodStatus::project(
                limit.period_spend(budget_type).unwrap_or_default(),
                limit.ceiling(budget_type),
                limit.warning_threshold_percent,
            )
        };

        Self {
            monthly: project(BudgetType::Monthly),
            daily: project(BudgetType::Daily),
        }
    }
}

/// Result of the status read path
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetStatusReport {
    pub has_budget: bool,
    pub budget_limits: Option<BudgetLimit>,
    pub status: Option<BudgetStatusSnapshot>,
}

impl BudgetStatusReport {
    pub fn no_budget() -> Self {
        Self {
            has_budget: false,
            budget_limits: None,
            status: None,
        }
    }

    pub fn for_limit(limit: BudgetLimit) -> Self {
        let status = BudgetStatusSnapshot::from_limit(&limit);

        Self {
            has_budget: true,
            budget_limits: Some(limit),
            status: Some(status),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::budget::{BudgetLimitSettings, BudgetScope};
    use chrono::Utc;

    #[test]
    fn test_unconstrained_projection() {
        let status = PeriodStatus::project(42.0, None, 80);

        assert_eq!(status.percentage, 0.0);
        assert!(!status.is_warning);
        assert!(!status.is_exceeded);
    }

    #[test]
    fn test_two_decimal_percentage() {
        let status = PeriodStatus::project(1.0, Some(3.0), 80);
        assert_eq!(status.percentage, 33.33);

        let status = PeriodStatus::project(2.0, Some(3.0), 80);
        assert_eq!(status.percentage, 66.67);
    }

    #[test]
    fn test_warning_band() {
        let status = PeriodStatus::project(8.5, Some(10.0), 80);

        assert_eq!(status.percentage, 85.0);
        assert!(status.is_warning);
        assert!(!status.is_exceeded);
    }

    #[test]
    fn test_exceeded_not_capped() {
        let status = PeriodStatus::project(15.0, Some(10.0), 80);

        assert_eq!(status.percentage, 150.0);
        assert!(status.is_exceeded);
        assert!(!status.is_warning);
    }

    #[test]
    fn test_zero_limit_projects_as_exceeded() {
        let status = PeriodStatus::project(0.0, Some(0.0), 80);

        assert_eq!(status.percentage, 100.0);
        assert!(status.is_exceeded);
    }

    #[test]
    fn test_report_serialization() {
        let settings = BudgetLimitSettings::new(BudgetScope::Global)
            .with_monthly(100.0)
            .with_daily(10.0);
        let limit = crate::domain::budget::BudgetLimit::new("l", "u", &settings, Utc::now())
            .with_counters(50.0, 9.0, None, None);

        let json = serde_json::to_value(BudgetStatusReport::for_limit(limit)).unwrap();

        assert_eq!(json["hasBudget"], true);
        assert_eq!(json["status"]["monthly"]["percentage"], 50.0);
        assert_eq!(json["status"]["daily"]["isWarning"], true);
        assert_eq!(json["budgetLimits"]["id"], "l");

        let json = serde_json::to_value(BudgetStatusReport::no_budget()).unwrap();
        assert_eq!(json["hasBudget"], false);
        assert!(json["budgetLimits"].is_null());
        assert!(json["status"].is_null());
    }
}
