//! Budget exceeded error raised by the pre-flight gate

use super::BudgetType;

/// A configured ceiling has already been reached
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetExceeded {
    pub budget_type: BudgetType,
    pub spent: f64,
    pub limit: f64,
    /// Provider of the governing row; `None` when the global row applied
    pub provider: Option<String>,
}

impl BudgetExceeded {
    pub fn new(budget_type: BudgetType, spent: f64, limit: f64, provider: Option<String>) -> Self {
        Self {
            budget_type,
            spent,
            limit,
            provider,
        }
    }

    /// Message shown to the user when a chat turn is halted
    pub fn user_message(&self, settings_url: &str) -> String {
        format!(
            "{} budget exceeded for {}: ${:.2} spent of ${:.2} limit. Adjust your limits at {}",
            self.budget_type.label(),
            self.provider.as_deref().unwrap_or("this provider"),
            self.spent,
            self.limit,
            settings_url
        )
    }
}

impl std::fmt::Display for BudgetExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} budget exceeded: ${:.2} spent of ${:.2} limit",
            self.budget_type.label(),
            self.spent,
            self.limit
        )?;

        if let Some(provider) = &self.provider {
            write!(f, " for {}", provider)?;
        }

        Ok(())
    }
}

impl std::error::Error for BudgetExceeded {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = BudgetExceeded::new(BudgetType::Daily, 5.5, 5.0, Some("openai".into()));
        assert_eq!(
            err.to_string(),
            "Daily budget exceeded: $5.50 spent of $5.00 limit for openai"
        );

        let err = BudgetExceeded::new(BudgetType::PerChat, 1.2, 1.0, None);
        assert_eq!(err.to_string(), "Per-chat budget exceeded: $1.20 spent of $1.00 limit");
    }

    #[test]
    fn test_user_message_names_scope_and_settings() {
        let err = BudgetExceeded::new(BudgetType::Monthly, 100.0, 100.0, None);
        let message = err.user_message("/settings/budget");

        assert!(message.starts_with("Monthly budget exceeded for this provider"));
        assert!(message.contains("$100.00 spent of $100.00 limit"));
        assert!(message.ends_with("/settings/budget"));
    }
}
