//! Usage recording endpoint for the chat pipeline

use axum::{extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::UsageRecord;
use crate::infrastructure::usage::RecordUsageParams;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordUsageRequest {
    pub provider_id: String,
    pub model_id: String,
    #[serde(default)]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    /// Priced from the model table when absent
    #[serde(default)]
    pub cost_usd: Option<f64>,
}

impl RecordUsageRequest {
    fn into_params(self, user_id: &str) -> RecordUsageParams {
        let mut params = RecordUsageParams::new(user_id, self.provider_id, self.model_id)
            .with_tokens(self.input_tokens, self.output_tokens);

        if let Some(chat_id) = self.chat_id.filter(|c| !c.trim().is_empty()) {
            params = params.with_chat_id(chat_id);
        }
        if let Some(cost) = self.cost_usd {
            params = params.with_cost(cost);
        }

        params
    }
}

#[derive(Debug, Serialize)]
pub struct RecordUsageResponse {
    pub usage: UsageRecord,
}

/// POST /api/usage
pub async fn record_usage(
    RequireUser(user): RequireUser,
    State(state): State<AppState>,
    Json(request): Json<RecordUsageRequest>,
) -> Result<(StatusCode, Json<RecordUsageResponse>), ApiError> {
    let usage = state
        .usage_service
        .record(request.into_params(&user.id))
        .await?;

    Ok((StatusCode::CREATED, Json(RecordUsageResponse { usage })))
}
