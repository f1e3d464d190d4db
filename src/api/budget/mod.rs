//! Budget settings, status, alerts and usage endpoints

mod alerts;
mod limits;
mod status;
mod usage;

use axum::{
    routing::{get, post},
    Router,
};

use super::state::AppState;

pub use alerts::{AcknowledgeAlertsRequest, AlertsResponse, ListAlertsQuery};
pub use limits::{
    BudgetLimitInput, BudgetLimitsResponse, SaveBudgetLimitsRequest, SaveBudgetLimitsResponse,
    SuccessResponse,
};
pub use status::{BudgetCheckRequest, BudgetCheckResponse};
pub use usage::{RecordUsageRequest, RecordUsageResponse};

/// Routes mounted under `/api`
pub fn create_budget_router() -> Router<AppState> {
    Router::new()
        .route(
            "/budget-limits",
            get(limits::list_budget_limits)
                .post(limits::save_budget_limits)
                .delete(limits::delete_budget_limits),
        )
        .route("/budget-status", get(status::get_budget_status))
        .route("/budget-check", post(status::check_budget))
        .route(
            "/budget-alerts",
            get(alerts::list_budget_alerts).post(alerts::acknowledge_budget_alerts),
        )
        .route("/usage", post(usage::record_usage))
}
