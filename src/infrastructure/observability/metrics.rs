//! Prometheus metrics infrastructure

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use axum::{extract::State, response::IntoResponse, routing::get, Router};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use regex::Regex;

use super::config::MetricsConfig;
use crate::domain::budget::{AlertType, BudgetType};

static UUID_SEGMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}").ok()
});

static NUMERIC_SEGMENT: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"/\d+(/|$)").ok());

/// Prometheus metrics handle for serving the metrics endpoint
#[derive(Clone)]
pub struct PrometheusMetrics {
    handle: Arc<PrometheusHandle>,
}

impl PrometheusMetrics {
    /// Get the metrics as a string for the /metrics endpoint
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for PrometheusMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusMetrics").finish_non_exhaustive()
    }
}

/// Initialize Prometheus metrics
pub fn init_metrics(config: &MetricsConfig) -> Option<PrometheusMetrics> {
    if !config.enabled {
        tracing::info!("Prometheus metrics disabled");
        return None;
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            gauge!("chat_budget_info", "version" => env!("CARGO_PKG_VERSION")).set(1.0);

            tracing::info!(path = %config.path, "Prometheus metrics initialized");

            Some(PrometheusMetrics {
                handle: Arc::new(handle),
            })
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize Prometheus metrics");
            None
        }
    }
}

/// Create the metrics router
pub fn create_metrics_router(metrics: PrometheusMetrics, path: &str) -> Router {
    Router::new()
        .route(path, get(metrics_handler))
        .with_state(metrics)
}

async fn metrics_handler(State(metrics): State<PrometheusMetrics>) -> impl IntoResponse {
    metrics.render()
}

/// Record an HTTP request metric
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!("http_requests_total", &labels).increment(1);
    histogram!("http_request_duration_seconds", &labels).record(duration.as_secs_f64());

    if status >= 500 {
        counter!("http_server_errors_total", &labels).increment(1);
    }
}

/// Record the outcome of a budget gate check
///
/// `outcome` is one of `allowed`, `blocked`, `no_budget`, `not_enforced` or `error`.
pub fn record_gate_outcome(outcome: &str, budget_type: Option<BudgetType>) {
    let labels = [
        ("outcome", outcome.to_string()),
        (
            "budget_type",
            budget_type.map_or("none", |t| t.as_str()).to_string(),
        ),
    ];

    counter!("budget_gate_checks_total", &labels).increment(1);
}

/// Record spend posted to a budget
pub fn record_spend(provider: &str, cost_usd: f64) {
    let labels = [("provider", provider.to_string())];

    counter!("budget_spend_postings_total", &labels).increment(1);
    histogram!("budget_spend_usd", &labels).record(cost_usd);
}

/// Record a threshold alert being created or suppressed as a duplicate
pub fn record_alert_outcome(alert_type: AlertType, budget_type: BudgetType, outcome: &str) {
    let labels = [
        ("alert_type", alert_type.as_str().to_string()),
        ("budget_type", budget_type.as_str().to_string()),
        ("outcome", outcome.to_string()),
    ];

    counter!("budget_alerts_total", &labels).increment(1);
}

/// Record a swallowed bookkeeping write failure (`reset`, `spend` or `alert`)
pub fn record_bookkeeping_failure(operation: &str) {
    counter!("budget_bookkeeping_failures_total", "operation" => operation.to_string())
        .increment(1);
}

/// Sanitize URL path for metric labels (remove IDs, limit cardinality)
fn sanitize_path(path: &str) -> String {
    let mut path = path.to_string();

    if let Some(re) = UUID_SEGMENT.as_ref() {
        path = re.replace_all(&path, "{id}").into_owned();
    }

    if let Some(re) = NUMERIC_SEGMENT.as_ref() {
        path = re.replace_all(&path, "/{id}$1").into_owned();
    }

    path.chars().take(50).collect()
}
