use axum::{
    Extension, Json,
    extract::{Path, State},
};
use chrono::Utc;
use std::sync::Arc;

use super::auth::CurrentAgent;
use super::validation::validate_schedule_id;
use super::{ApiError, ApiResponse, AppState, MessageResponse, OptionDto};
use crate::domain::{InsuranceFocus, Tone};
use crate::models::Schedule;
use crate::services::{GenerateOutcome, GenerateRequest};

/// GET /content/insurance-types
pub async fn list_insurance_types() -> Json<ApiResponse<Vec<OptionDto>>> {
    Json(ApiResponse::success(
        InsuranceFocus::ALL.into_iter().map(OptionDto::from).collect(),
    ))
}

/// GET /content/tones
pub async fn list_tones() -> Json<ApiResponse<Vec<OptionDto>>> {
    Json(ApiResponse::success(
        Tone::ALL.into_iter().map(OptionDto::from).collect(),
    ))
}

/// POST /content/generate
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<ApiResponse<GenerateOutcome>>, ApiError> {
    let outcome = state
        .shared
        .content_service
        .generate(agent_id, payload)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// GET /content/schedules
pub async fn list_schedules(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
) -> Result<Json<ApiResponse<Vec<Schedule>>>, ApiError> {
    let schedules = state.shared.content_service.list(agent_id).await?;
    Ok(Json(ApiResponse::success(schedules)))
}

/// GET /content/schedules/{id}
pub async fn get_schedule(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<Schedule>>, ApiError> {
    let id = validate_schedule_id(id)?;
    let schedule = state.shared.content_service.get(agent_id, id).await?;
    Ok(Json(ApiResponse::success(schedule)))
}

/// DELETE /content/schedules/{id}
pub async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_schedule_id(id)?;
    state.shared.content_service.delete(agent_id, id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Schedule deleted",
    ))))
}

/// GET /content/current-week
pub async fn current_week(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
) -> Result<Json<ApiResponse<Schedule>>, ApiError> {
    let schedule = state
        .shared
        .content_service
        .current_week(agent_id, Utc::now().date_naive())
        .await?;
    Ok(Json(ApiResponse::success(schedule)))
}
