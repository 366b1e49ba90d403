use axum::{Extension, Json, extract::State};
use std::sync::Arc;

use super::auth::CurrentAgent;
use super::{ApiError, ApiResponse, AppState};
use crate::models::UsageSummary;

/// `GET /api/usage`
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
) -> Result<Json<ApiResponse<UsageSummary>>, ApiError> {
    let summary = state.shared.usage_service.summary(agent_id).await?;
    Ok(Json(ApiResponse::success(summary)))
}
