//! Budget status and pre-flight check endpoints

use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::budget::{BudgetLimit, BudgetStatusReport};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCheckRequest {
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetCheckResponse {
    pub allowed: bool,
    pub budget_limits: Option<BudgetLimit>,
}

/// GET /api/budget-status
pub async fn get_budget_status(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<BudgetStatusReport>, ApiError> {
    let report = state.budget_service.get_status(&user.id).await?;

    Ok(Json(report))
}

/// POST /api/budget-check
///
/// Blocked calls answer 402 with the exceeded budget in `error.details`.
pub async fn check_budget(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(request): Json<BudgetCheckRequest>,
) -> Result<Json<BudgetCheckResponse>, ApiError> {
    let budget_limits = state
        .budget_service
        .check_budget_before_chat(
            &user.id,
            request.provider_id.as_deref(),
            request.chat_id.as_deref(),
        )
        .await
        .map_err(|e| ApiError::from_domain(e, &state.budget_settings.settings_url))?;

    Ok(Json(BudgetCheckResponse {
        allowed: true,
        budget_limits,
    }))
}
