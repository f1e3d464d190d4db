//! Warning and limit thresholds evaluated after spend is recorded

use super::{AlertType, BudgetType, NewBudgetAlert};

/// A threshold crossed by a running total
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdBreach {
    pub alert_type: AlertType,
    pub budget_type: BudgetType,
    pub threshold_percent: u8,
    pub spent: f64,
    pub limit: f64,
}

/// Classify a running total against its ceiling.
///
/// A zero ceiling always reports `limit_reached` at 100%, whatever the spend.
/// Otherwise the ceiling being reached wins over the warning threshold, and the
/// warning carries the rounded percentage actually reached.
pub fn evaluate_threshold(
    budget_type: BudgetType,
    spent: f64,
    limit: Option<f64>,
    warning_threshold_percent: u8,
) -> Option<ThresholdBreach> {
    let limit = limit?;

    let breach = |alert_type, threshold_percent| ThresholdBreach {
        alert_type,
        budget_type,
        threshold_percent,
        spent,
        limit,
    };

    if limit == 0.0 {
        return Some(breach(AlertType::LimitReached, 100));
    }

    let percent = spent / limit * 100.0;

    if percent >= 100.0 {
        Some(breach(AlertType::LimitReached, 100))
    } else if percent >= f64::from(warning_threshold_percent) {
        Some(breach(AlertType::Warning, percent.round().clamp(0.0, 99.0) as u8))
    } else {
        None
    }
}

impl ThresholdBreach {
    /// User-facing alert text
    pub fn message(&self, provider_id: Option<&str>) -> String {
        let scope = provider_id
            .map(|p| format!("for {}", p))
            .unwrap_or_else(|| "across all providers".to_string());
        let period = self.budget_type.label().to_lowercase();

        match self.alert_type {
            AlertType::Warning => format!(
                "You have used {}% of your {} budget {} (${:.2} of ${:.2}).",
                self.threshold_percent, period, scope, self.spent, self.limit
            ),
            AlertType::LimitReached | AlertType::BudgetExceeded => format!(
                "You have reached your {} budget of ${:.2} {} (spent ${:.2}). Further requests will be blocked until the budget resets or is raised.",
                period, self.limit, scope, self.spent
            ),
        }
    }

    pub fn into_new_alert(self, user_id: impl Into<String>, provider_id: Option<&str>) -> NewBudgetAlert {
        let message = self.message(provider_id);

        NewBudgetAlert {
            user_id: user_id.into(),
            alert_type: self.alert_type,
            budget_type: self.budget_type,
            threshold_percent: self.threshold_percent,
            amount_spent: self.spent,
            budget_limit: self.limit,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconstrained_never_alerts() {
        assert!(evaluate_threshold(BudgetType::Daily, 1_000.0, None, 80).is_none());
    }

    #[test]
    fn test_zero_budget_is_limit_reached() {
        let breach = evaluate_threshold(BudgetType::Daily, 0.001, Some(0.0), 80).unwrap();

        assert_eq!(breach.alert_type, AlertType::LimitReached);
        assert_eq!(breach.threshold_percent, 100);

        let breach = evaluate_threshold(BudgetType::Monthly, 0.0, Some(0.0), 80).unwrap();
        assert_eq!(breach.alert_type, AlertType::LimitReached);
    }

    #[test]
    fn test_below_warning() {
        assert!(evaluate_threshold(BudgetType::Monthly, 7.0, Some(10.0), 80).is_none());
    }

    #[test]
    fn test_warning_uses_rounded_percentage() {
        let breach = evaluate_threshold(BudgetType::Monthly, 8.46, Some(10.0), 80).unwrap();

        assert_eq!(breach.alert_type, AlertType::Warning);
        assert_eq!(breach.threshold_percent, 85);
    }

    #[test]
    fn test_warning_exactly_at_threshold() {
        let breach = evaluate_threshold(BudgetType::Daily, 8.0, Some(10.0), 80).unwrap();
        assert_eq!(breach.alert_type, AlertType::Warning);
        assert_eq!(breach.threshold_percent, 80);
    }

    #[test]
    fn test_reaching_limit() {
        let at_limit = evaluate_threshold(BudgetType::Daily, 10.0, Some(10.0), 80).unwrap();
        assert_eq!(at_limit.alert_type, AlertType::LimitReached);
        assert_eq!(at_limit.threshold_percent, 100);

        let over = evaluate_threshold(BudgetType::Daily, 25.0, Some(10.0), 80).unwrap();
        assert_eq!(over.alert_type, AlertType::LimitReached);
    }

    #[test]
    fn test_just_under_limit_stays_a_warning() {
        let breach = evaluate_threshold(BudgetType::Daily, 9.999, Some(10.0), 80).unwrap();

        assert_eq!(breach.alert_type, AlertType::Warning);
        assert_eq!(breach.threshold_percent, 99);
    }

    #[test]
    fn test_messages_name_scope() {
        let breach = evaluate_threshold(BudgetType::Daily, 9.0, Some(10.0), 80).unwrap();
        let alert = breach.into_new_alert("user-1", Some("openai"));

        assert_eq!(alert.user_id, "user-1");
        assert!(alert.message.contains("90%"));
        assert!(alert.message.contains("daily"));
        assert!(alert.message.contains("openai"));

        let breach = evaluate_threshold(BudgetType::Monthly, 12.0, Some(10.0), 80).unwrap();
        let message = breach.message(None);
        assert!(message.contains("across all providers"));
        assert!(message.contains("$10.00"));
    }
}
