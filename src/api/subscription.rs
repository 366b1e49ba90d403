//! Subscription endpoints and the billing provider webhook.
//!
//! Handlers only translate HTTP into [`SubscriptionService`] calls; trial and
//! entitlement rules live in the domain layer.
//!
//! [`SubscriptionService`]: crate::services::SubscriptionService

use axum::{
    Extension, Json,
    body::Bytes,
    extract::State,
    http::HeaderMap,
};
use std::sync::Arc;

use super::auth::CurrentAgent;
use super::{ApiError, ApiResponse, AppState, CheckoutRequest, PortalResponse};
use crate::services::{CheckoutView, Pricing, SubscriptionView, WebhookReceipt};

const SIGNATURE_HEADER: &str = "stripe-signature";

/// `GET /api/subscription/pricing`
pub async fn pricing(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Pricing>> {
    Json(ApiResponse::success(
        state.shared.subscription_service.pricing(),
    ))
}

/// `GET /api/subscription/status`
pub async fn status(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
) -> Result<Json<ApiResponse<SubscriptionView>>, ApiError> {
    let view = state.shared.subscription_service.status(agent_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// `POST /api/subscription/checkout`
pub async fn checkout(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
    Json(payload): Json<CheckoutRequest>,
) -> Result<Json<ApiResponse<CheckoutView>>, ApiError> {
    let view = state
        .shared
        .subscription_service
        .checkout(agent_id, payload.plan_type)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

/// `POST /api/subscription/portal`
pub async fn portal(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
) -> Result<Json<ApiResponse<PortalResponse>>, ApiError> {
    let portal_url = state.shared.subscription_service.portal(agent_id).await?;
    Ok(Json(ApiResponse::success(PortalResponse { portal_url })))
}

/// `POST /api/subscription/cancel`
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
) -> Result<Json<ApiResponse<SubscriptionView>>, ApiError> {
    let view = state.shared.subscription_service.cancel(agent_id).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// `POST /api/subscription/reactivate`
pub async fn reactivate(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
) -> Result<Json<ApiResponse<SubscriptionView>>, ApiError> {
    let view = state
        .shared
        .subscription_service
        .reactivate(agent_id)
        .await?;
    Ok(Json(ApiResponse::success(view)))
}

/// `POST /api/subscription/webhook`
///
/// The body is taken raw because the signature covers the exact bytes sent.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<WebhookReceipt>>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let receipt = state
        .shared
        .subscription_service
        .handle_webhook(&body, signature)
        .await?;
    Ok(Json(ApiResponse::success(receipt)))
}
