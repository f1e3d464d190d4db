//! Budget alert listing and acknowledgement endpoints

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::limits::SuccessResponse;
use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::budget::{AlertQuery, BudgetAlert};

#[derive(Debug, Default, Deserialize)]
pub struct ListAlertsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: Option<usize>,
    #[serde(default)]
    pub unacknowledged: Option<bool>,
}

impl From<ListAlertsQuery> for AlertQuery {
    fn from(query: ListAlertsQuery) -> Self {
        let defaults = AlertQuery::default();

        Self {
            limit: query.limit.unwrap_or(defaults.limit),
            offset: query.offset.unwrap_or(defaults.offset),
            unacknowledged_only: query.unacknowledged.unwrap_or(false),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    pub alerts: Vec<BudgetAlert>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeAlertsRequest {
    pub alert_ids: Vec<String>,
}

/// GET /api/budget-alerts
pub async fn list_budget_alerts(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Query(query): Query<ListAlertsQuery>,
) -> Result<Json<AlertsResponse>, ApiError> {
    let page = state
        .budget_service
        .list_alerts(&user.id, query.into())
        .await?;

    Ok(Json(AlertsResponse {
        alerts: page.alerts,
        total: page.total,
    }))
}

/// POST /api/budget-alerts
pub async fn acknowledge_budget_alerts(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(request): Json<AcknowledgeAlertsRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .budget_service
        .acknowledge_alerts(&user.id, &request.alert_ids)
        .await?;

    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_defaults() {
        let query: AlertQuery = ListAlertsQuery::default().into();
        assert_eq!(query, AlertQuery::default());
    }

    #[test]
    fn test_query_values_pass_through() {
        let query: AlertQuery = ListAlertsQuery {
            limit: Some(500),
            offset: Some(20),
            unacknowledged: Some(true),
        }
        .into();

        assert_eq!(query.limit, 500);
        assert_eq!(query.offset, 20);
        assert!(query.unacknowledged_only);
    }
}
