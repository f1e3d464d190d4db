//! Observability configuration

use serde::Deserialize;

use crate::domain::DomainError;

/// Paths owned by the API router
const RESERVED_PATHS: [&str; 3] = ["/api", "/health", "/ready"];

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub tracing: TracingConfig,
    pub metrics: MetricsConfig,
}

/// OpenTelemetry span export
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub enabled: bool,
    /// OTLP gRPC endpoint
    pub otlp_endpoint: String,
    pub service_name: String,
    /// Fraction of traces kept, 0.0 to 1.0
    pub sampling_ratio: f64,
}

/// Prometheus scrape endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub path: String,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: "http://localhost:4317".to_string(),
            service_name: "pmp-chat-budget".to_string(),
            sampling_ratio: 1.0,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: "/metrics".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn validate(&self) -> Result<(), DomainError> {
        let ratio = self.tracing.sampling_ratio;
        if !(0.0..=1.0).contains(&ratio) {
            return Err(DomainError::configuration(format!(
                "observability.tracing.sampling_ratio must be between 0 and 1, got {}",
                ratio
            )));
        }

        if self.metrics.enabled {
            let path = self.metrics.path.as_str();

            if !path.starts_with('/') || path.len() < 2 {
                return Err(DomainError::configuration(format!(
                    "observability.metrics.path must be an absolute path, got '{}'",
                    path
                )));
            }

            if RESERVED_PATHS
                .iter()
                .any(|reserved| path == *reserved || path.starts_with(&format!("{}/", reserved)))
            {
                return Err(DomainError::configuration(format!(
                    "observability.metrics.path '{}' collides with an API route",
                    path
                )));
            }
        }

        Ok(())
    }
}
