//! Application configuration

mod app_config;

pub use app_config::{
    AppConfig, AuthConfig, BudgetConfig, LogFormat, LoggingConfig, ServerConfig, StorageSettings,
};
