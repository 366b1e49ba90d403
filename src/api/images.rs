use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::auth::CurrentAgent;
use super::validation::{validate_post_id, validate_schedule_id};
use super::{ApiError, ApiResponse, AppState, RegenerateImageRequest};
use crate::services::{BatchOutcome, ImageOutcome};

/// POST /images/generate/{post_id}
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
    Path(post_id): Path<i32>,
) -> Result<Json<ApiResponse<ImageOutcome>>, ApiError> {
    let post_id = validate_post_id(post_id)?;
    let outcome = state
        .shared
        .image_service
        .generate(agent_id, post_id)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// POST /images/regenerate/{post_id}
pub async fn regenerate(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
    Path(post_id): Path<i32>,
    payload: Option<Json<RegenerateImageRequest>>,
) -> Result<Json<ApiResponse<ImageOutcome>>, ApiError> {
    let post_id = validate_post_id(post_id)?;
    let description = payload.and_then(|Json(body)| body.image_description);
    let outcome = state
        .shared
        .image_service
        .regenerate(agent_id, post_id, description)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// POST /images/generate-all/{schedule_id}
pub async fn generate_all(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
    Path(schedule_id): Path<i32>,
) -> Result<Json<ApiResponse<BatchOutcome>>, ApiError> {
    let schedule_id = validate_schedule_id(schedule_id)?;
    let outcome = state
        .shared
        .image_service
        .generate_all(agent_id, schedule_id)
        .await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// GET /images/download/{post_id}
pub async fn download(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
    Path(post_id): Path<i32>,
) -> Result<Response, ApiError> {
    let post_id = validate_post_id(post_id)?;
    let image = state
        .shared
        .image_service
        .download(agent_id, post_id)
        .await?;

    let content_type = HeaderValue::from_str(&image.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("image/png"));
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        image.filename
    ))
    .map_err(|e| ApiError::internal(format!("Invalid filename header: {e}")))?;

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Bytes::from(image.bytes),
    )
        .into_response())
}
