//! Budget limit settings endpoints

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::budget::{BudgetLimit, BudgetLimitId, BudgetLimitSettings, BudgetScope};
use crate::infrastructure::budget::SaveLimitError;

/// One limit as submitted from the settings page
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLimitInput {
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub monthly_budget_usd: Option<f64>,
    #[serde(default)]
    pub daily_budget_usd: Option<f64>,
    #[serde(default)]
    pub per_chat_budget_usd: Option<f64>,
    #[serde(default)]
    pub warning_threshold_percent: Option<f64>,
    #[serde(default)]
    pub enforce_limits: Option<bool>,
    #[serde(default)]
    pub email_notifications: Option<bool>,
    #[serde(default)]
    pub in_app_notifications: Option<bool>,
}

impl BudgetLimitInput {
    /// Convert to settings, rejecting a threshold that is not a whole percent.
    ///
    /// Range checks on the other fields are left to [`BudgetLimitSettings::validate`].
    fn into_settings(
        self,
        default_warning_threshold_percent: u8,
    ) -> Result<BudgetLimitSettings, String> {
        let warning_threshold_percent = match self.warning_threshold_percent {
            None => default_warning_threshold_percent,
            Some(percent) if percent.fract() == 0.0 && (0.0..=100.0).contains(&percent) => {
                percent as u8
            }
            Some(percent) => {
                return Err(format!(
                    "warningThresholdPercent must be a whole number between 0 and 100, got {}",
                    percent
                ));
            }
        };

        let mut settings = BudgetLimitSettings::new(BudgetScope::from_provider(
            self.provider_id.as_deref(),
        ));

        settings.monthly_budget_usd = self.monthly_budget_usd;
        settings.daily_budget_usd = self.daily_budget_usd;
        settings.per_chat_budget_usd = self.per_chat_budget_usd;
        settings.warning_threshold_percent = warning_threshold_percent;

        if let Some(enforce) = self.enforce_limits {
            settings.enforce_limits = enforce;
        }
        if let Some(email) = self.email_notifications {
            settings.email_notifications = email;
        }
        if let Some(in_app) = self.in_app_notifications {
            settings.in_app_notifications = in_app;
        }

        Ok(settings)
    }
}

#[derive(Debug, Deserialize)]
pub struct SaveBudgetLimitsRequest {
    pub budgets: Vec<BudgetLimitInput>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLimitsResponse {
    pub budget_limits: Vec<BudgetLimit>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveLimitErrorResponse {
    pub index: usize,
    pub provider_id: Option<String>,
    pub message: String,
}

impl From<SaveLimitError> for SaveLimitErrorResponse {
    fn from(err: SaveLimitError) -> Self {
        Self {
            index: err.index,
            provider_id: err.provider_id,
            message: err.message,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBudgetLimitsResponse {
    pub budget_limits: Vec<BudgetLimit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<SaveLimitErrorResponse>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteBudgetLimitsQuery {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// GET /api/budget-limits
pub async fn list_budget_limits(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
) -> Result<Json<BudgetLimitsResponse>, ApiError> {
    let budget_limits = state.budget_service.list_limits(&user.id).await?;

    Ok(Json(BudgetLimitsResponse { budget_limits }))
}

/// POST /api/budget-limits
pub async fn save_budget_limits(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(request): Json<SaveBudgetLimitsRequest>,
) -> Result<Json<SaveBudgetLimitsResponse>, ApiError> {
    let default_threshold = state.budget_settings.default_warning_threshold_percent;
    let mut budgets = Vec::with_capacity(request.budgets.len());
    let mut positions = Vec::with_capacity(request.budgets.len());
    let mut errors = Vec::new();

    for (index, input) in request.budgets.into_iter().enumerate() {
        let provider_id = input.provider_id.clone();
        match input.into_settings(default_threshold) {
            Ok(settings) => {
                budgets.push(settings);
                positions.push(index);
            }
            Err(message) => errors.push(SaveLimitErrorResponse {
                index,
                provider_id,
                message,
            }),
        }
    }

    let outcome = state.budget_service.save_limits(&user.id, budgets).await;

    // Service indices refer to the filtered batch
    errors.extend(outcome.errors.into_iter().map(|err| {
        let index = positions.get(err.index).copied().unwrap_or(err.index);
        SaveLimitErrorResponse {
            index,
            ..SaveLimitErrorResponse::from(err)
        }
    }));
    errors.sort_by_key(|err| err.index);

    info!(
        user_id = %user.id,
        saved = outcome.limits.len(),
        failed = errors.len(),
        "Saved budget limits"
    );

    Ok(Json(SaveBudgetLimitsResponse {
        budget_limits: outcome.limits,
        errors,
    }))
}

/// DELETE /api/budget-limits[?id=]
pub async fn delete_budget_limits(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Query(query): Query<DeleteBudgetLimitsQuery>,
) -> Result<Json<SuccessResponse>, ApiError> {
    match query.id.filter(|id| !id.trim().is_empty()) {
        Some(id) => {
            let deleted = state
                .budget_service
                .delete_limit(&user.id, &BudgetLimitId::new(id.clone()))
                .await?;

            if !deleted {
                return Err(ApiError::not_found(format!(
                    "Budget limit '{}' not found",
                    id
                )));
            }
        }
        None => {
            state.budget_service.delete_limits(&user.id).await?;
        }
    }

    Ok(Json(SuccessResponse { success: true }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_defaults() {
        let input: BudgetLimitInput = serde_json::from_str(r#"{"monthlyBudgetUsd": 50}"#).unwrap();
        let settings = input.into_settings(75).unwrap();

        assert_eq!(settings.provider_id, None);
        assert_eq!(settings.monthly_budget_usd, Some(50.0));
        assert_eq!(settings.warning_threshold_percent, 75);
        assert!(settings.enforce_limits);
        assert!(settings.in_app_notifications);
        assert!(!settings.email_notifications);
    }

    #[test]
    fn test_input_overrides() {
        let input: BudgetLimitInput = serde_json::from_str(
            r#"{
                "providerId": "openai",
                "dailyBudgetUsd": 2.5,
                "warningThresholdPercent": 90,
                "enforceLimits": false,
                "emailNotifications": true
            }"#,
        )
        .unwrap();
        let settings = input.into_settings(80).unwrap();

        assert_eq!(settings.provider_id.as_deref(), Some("openai"));
        assert_eq!(settings.daily_budget_usd, Some(2.5));
        assert_eq!(settings.warning_threshold_percent, 90);
        assert!(!settings.enforce_limits);
        assert!(settings.email_notifications);
    }

    #[test]
    fn test_input_rejects_bad_threshold() {
        for raw in ["300", "80.5", "-1"] {
            let input: BudgetLimitInput = serde_json::from_str(&format!(
                r#"{{"monthlyBudgetUsd": 10, "warningThresholdPercent": {}}}"#,
                raw
            ))
            .unwrap();

            let err = input.into_settings(80).unwrap_err();
            assert!(err.contains("warningThresholdPercent"), "{}", err);
        }
    }

    #[test]
    fn test_save_response_omits_empty_errors() {
        let response = SaveBudgetLimitsResponse {
            budget_limits: vec![],
            errors: vec![],
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json, serde_json::json!({ "budgetLimits": [] }));
    }
}
