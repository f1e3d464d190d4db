//! PMP Chat Budget
//!
//! Per-user spending limits for LLM chat:
//! - Global and per-provider monthly, daily and per-chat ceilings
//! - A pre-flight gate that blocks calls once a ceiling is reached
//! - Spend recording with warning and limit alerts
//! - In-memory or PostgreSQL storage

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use anyhow::Context;
use api::state::{AppState, BudgetApiSettings};
use domain::usage::default_pricing_table;
use domain::SystemClock;
use infrastructure::{
    auth::JwtService,
    budget::BudgetService,
    storage::StorageFactory,
    usage::UsageTrackingService,
};
use tracing::info;

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    config.budget.validate()?;

    let storage_config = config.storage.to_storage_config()?;
    info!(backend = ?storage_config.storage_type(), "Initializing storage");

    let repositories = StorageFactory::create(&storage_config)
        .await
        .context("failed to initialize storage")?;

    let clock = Arc::new(SystemClock);

    let budget_service = Arc::new(
        BudgetService::new(
            repositories.limits.clone(),
            repositories.alerts.clone(),
            repositories.usage.clone(),
            clock.clone(),
        )
        .with_config(config.budget.to_service_config()),
    );

    let pricing = default_pricing_table().with_overrides(config.pricing.iter().cloned());
    info!(models = pricing.len(), "Loaded model pricing");

    let usage_service = Arc::new(UsageTrackingService::new(
        repositories.usage.clone(),
        budget_service.clone(),
        pricing,
        clock,
    ));

    let session_validator = Arc::new(
        JwtService::new(config.auth.to_jwt_config())
            .context("auth.jwt_secret must be configured")?,
    );

    Ok(
        AppState::new(budget_service, usage_service, session_validator).with_budget_settings(
            BudgetApiSettings {
                settings_url: config.budget.settings_url.clone(),
                default_warning_threshold_percent: config.budget.default_warning_threshold_percent,
            },
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_from_in_memory_config() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config.budget.settings_url = "/account/budget".to_string();

        let state = create_app_state_with_config(&config).await.unwrap();

        assert_eq!(state.budget_settings.settings_url, "/account/budget");
        assert!(state.budget_service.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_jwt_secret_fails() {
        let config = AppConfig::default();

        assert!(create_app_state_with_config(&config).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_backend_fails() {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "test-secret".to_string();
        config.storage.backend = "cassandra".to_string();

        assert!(create_app_state_with_config(&config).await.is_err());
    }
}
