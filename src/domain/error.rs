use thiserror::Error;

use super::budget::BudgetExceeded;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error(transparent)]
    BudgetExceeded(#[from] BudgetExceeded),
}

impl DomainError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// The budget ceiling that blocked the call, if that is what this error is
    pub fn as_budget_exceeded(&self) -> Option<&BudgetExceeded> {
        match self {
            Self::BudgetExceeded(exceeded) => Some(exceeded),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::budget::BudgetType;

    #[test]
    fn test_not_found_error() {
        let error = DomainError::not_found("Budget limit 'abc' not found");
        assert_eq!(error.to_string(), "Not found: Budget limit 'abc' not found");
    }

    #[test]
    fn test_validation_error() {
        let error = DomainError::validation("Invalid input");
        assert_eq!(error.to_string(), "Validation error: Invalid input");
    }

    #[test]
    fn test_budget_exceeded_is_transparent() {
        let error: DomainError =
            BudgetExceeded::new(BudgetType::Monthly, 10.0, 10.0, Some("openai".into())).into();

        assert_eq!(
            error.to_string(),
            "Monthly budget exceeded: $10.00 spent of $10.00 limit for openai"
        );
        assert_eq!(error.as_budget_exceeded().unwrap().budget_type, BudgetType::Monthly);
        assert!(DomainError::storage("down").as_budget_exceeded().is_none());
    }
}
