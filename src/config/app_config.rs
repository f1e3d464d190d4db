use chrono::Duration;
use serde::Deserialize;

use crate::domain::budget::DEFAULT_WARNING_THRESHOLD_PERCENT;
use crate::domain::usage::ModelPricing;
use crate::domain::DomainError;
use crate::infrastructure::auth::JwtConfig;
use crate::infrastructure::budget::BudgetServiceConfig;
use crate::infrastructure::observability::ObservabilityConfig;
use crate::infrastructure::storage::{PostgresConfig, StorageConfig, StorageType};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
    /// Per-model prices added to or replacing the built-in table
    #[serde(default)]
    pub pricing: Vec<ModelPricing>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Allowed browser origins; empty allows any
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Storage backend settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// `in_memory` or `postgres`
    pub backend: String,
    /// Falls back to `DATABASE_URL`
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    /// Apply pending migrations on startup
    pub run_migrations: bool,
}

/// Session token settings
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub audience: Option<String>,
    pub issuer: Option<String>,
}

/// Budget service settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Same-kind alerts inside this window are suppressed
    pub alert_dedup_window_secs: u64,
    /// Threshold used when a saved limit omits one
    pub default_warning_threshold_percent: u8,
    /// Where users adjust their limits, quoted in budget errors
    pub settings_url: String,
    pub max_alert_page_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        let pg = PostgresConfig::default();

        Self {
            backend: "in_memory".to_string(),
            database_url: None,
            max_connections: pg.max_connections,
            min_connections: pg.min_connections,
            connect_timeout_secs: pg.connect_timeout_secs,
            idle_timeout_secs: pg.idle_timeout_secs,
            run_migrations: true,
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            alert_dedup_window_secs: 3600,
            default_warning_threshold_percent: DEFAULT_WARNING_THRESHOLD_PERCENT,
            settings_url: "/settings/budget".to_string(),
            max_alert_page_size: 200,
        }
    }
}

impl StorageSettings {
    /// Resolve the backend selection into a storage configuration
    pub fn to_storage_config(&self) -> Result<StorageConfig, DomainError> {
        let backend = StorageType::from_str(&self.backend).ok_or_else(|| {
            DomainError::configuration(format!("Unknown storage backend '{}'", self.backend))
        })?;

        match backend {
            StorageType::InMemory => Ok(StorageConfig::in_memory()),
            StorageType::Postgres => {
                let url = self
                    .database_url
                    .clone()
                    .or_else(|| std::env::var("DATABASE_URL").ok())
                    .ok_or_else(|| {
                        DomainError::configuration(
                            "storage.database_url or DATABASE_URL is required for postgres",
                        )
                    })?;

                Ok(StorageConfig::postgres(self.postgres_config(url), self.run_migrations))
            }
        }
    }

    pub fn postgres_config(&self, url: impl Into<String>) -> PostgresConfig {
        PostgresConfig::new(url)
            .with_max_connections(self.max_connections)
            .with_min_connections(self.min_connections)
            .with_connect_timeout(self.connect_timeout_secs)
            .with_idle_timeout(self.idle_timeout_secs)
    }
}

impl AuthConfig {
    pub fn to_jwt_config(&self) -> JwtConfig {
        let mut config = JwtConfig::new(self.jwt_secret.clone());
        config.audience = self.audience.clone().filter(|a| !a.is_empty());
        config.issuer = self.issuer.clone().filter(|i| !i.is_empty());
        config
    }
}

impl BudgetConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.default_warning_threshold_percent > 100 {
            return Err(DomainError::configuration(
                "budget.default_warning_threshold_percent must be between 0 and 100",
            ));
        }

        if self.max_alert_page_size == 0 {
            return Err(DomainError::configuration(
                "budget.max_alert_page_size must be positive",
            ));
        }

        Ok(())
    }

    pub fn to_service_config(&self) -> BudgetServiceConfig {
        let window = i64::try_from(self.alert_dedup_window_secs).unwrap_or(i64::MAX);

        BudgetServiceConfig {
            alert_dedup_window: Duration::try_seconds(window).unwrap_or(Duration::MAX),
            max_alert_page_size: self.max_alert_page_size,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.storage.backend, "in_memory");
        assert_eq!(config.budget.alert_dedup_window_secs, 3600);
        assert_eq!(config.budget.default_warning_threshold_percent, 80);
        assert!(config.pricing.is_empty());
    }

    #[test]
    fn test_deserialize_partial_sections() {
        let config: AppConfig = serde_json::from_value(serde_json::json!({
            "logging": { "level": "debug", "format": "json" },
            "budget": { "settings_url": "https://app.example.com/settings" },
            "pricing": [{
                "model_id": "custom",
                "provider": "openai",
                "input_per_million_usd": 1.0,
                "output_per_million_usd": 2.0
            }]
        }))
        .unwrap();

        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.budget.settings_url, "https://app.example.com/settings");
        assert_eq!(config.budget.max_alert_page_size, 200);
        assert_eq!(config.pricing[0].model_id, "custom");
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn test_storage_backend_resolution() {
        let in_memory = StorageSettings::default().to_storage_config().unwrap();
        assert_eq!(in_memory.storage_type(), StorageType::InMemory);

        let postgres = StorageSettings {
            backend: "postgres".to_string(),
            database_url: Some("postgres://db/budget".to_string()),
            max_connections: 4,
            ..Default::default()
        }
        .to_storage_config()
        .unwrap();

        match postgres {
            StorageConfig::Postgres { config, run_migrations } => {
                assert_eq!(config.url, "postgres://db/budget");
                assert_eq!(config.max_connections, 4);
                assert!(run_migrations);
            }
            other => panic!("expected postgres, got {:?}", other),
        }

        let unknown = StorageSettings {
            backend: "redis".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            unknown.to_storage_config(),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn test_budget_config_conversion() {
        let budget = BudgetConfig {
            alert_dedup_window_secs: 600,
            ..Default::default()
        };

        budget.validate().unwrap();
        let service = budget.to_service_config();
        assert_eq!(service.alert_dedup_window, Duration::minutes(10));
        assert_eq!(service.max_alert_page_size, 200);

        let invalid = BudgetConfig {
            default_warning_threshold_percent: 120,
            ..Default::default()
        };
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn test_blank_auth_claims_are_ignored() {
        let auth = AuthConfig {
            jwt_secret: "s".to_string(),
            audience: Some(String::new()),
            issuer: Some("https://auth.example.com".to_string()),
        };

        let jwt = auth.to_jwt_config();
        assert_eq!(jwt.audience, None);
        assert_eq!(jwt.issuer.as_deref(), Some("https://auth.example.com"));
    }
}
