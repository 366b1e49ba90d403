use axum::{
    Extension, Json,
    extract::{Request, State},
    middleware::Next,
    response::IntoResponse,
};
use chrono::Utc;
use std::sync::Arc;
use tower_sessions::Session;

use super::validation::{validate_focus_list, validate_tone};
use super::{ApiError, ApiResponse, AppState, LoginRequest, MessageResponse, ProfileRequest, RegisterRequest};
use crate::db::ProfileUpdate;
use crate::domain::AgentId;
use crate::domain::entitlement;
use crate::models::Agent;
use crate::services::{AccountView, Registration};

const SESSION_AGENT_KEY: &str = "agent_id";

/// Id of the signed-in agent, placed in request extensions by [`require_agent`].
#[derive(Debug, Clone, Copy)]
pub struct CurrentAgent(pub AgentId);

// ============================================================================
// Guards
// ============================================================================

/// Rejects requests without a signed-in agent.
pub async fn require_agent(
    session: Session,
    mut request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let agent_id = session
        .get::<i32>(SESSION_AGENT_KEY)
        .await
        .map_err(|e| ApiError::internal(format!("Session error: {e}")))?
        .ok_or_else(ApiError::unauthenticated)?;

    tracing::Span::current().record("user_id", agent_id);
    request
        .extensions_mut()
        .insert(CurrentAgent(AgentId::new(agent_id)));
    Ok(next.run(request).await)
}

/// Rejects agents whose trial ran out or who hold no live subscription.
/// Must run after [`require_agent`].
pub async fn require_entitlement(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let CurrentAgent(agent_id) = request
        .extensions()
        .get::<CurrentAgent>()
        .copied()
        .ok_or_else(ApiError::unauthenticated)?;

    let agent = state
        .store()
        .get_agent(agent_id)
        .await?
        .ok_or_else(ApiError::unauthenticated)?;

    if let Some(reason) = entitlement::denial_reason(&agent.subscription, Utc::now()) {
        tracing::info!(agent_id = %agent_id, reason = reason.code(), "Generation refused");
        return Err(ApiError::NotEntitled(reason));
    }

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<ApiResponse<AccountView>>, ApiError> {
    let agent = state
        .shared
        .auth_service
        .register(Registration {
            email: payload.email,
            password: payload.password,
            first_name: payload.first_name,
            last_name: payload.last_name,
        })
        .await?;

    start_session(&session, &agent).await?;
    let account = state.shared.auth_service.account(agent.id).await?;
    Ok(Json(ApiResponse::success(account)))
}

/// POST /auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AccountView>>, ApiError> {
    if payload.email.trim().is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let agent = state
        .shared
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    start_session(&session, &agent).await?;
    let account = state.shared.auth_service.account(agent.id).await?;
    Ok(Json(ApiResponse::success(account)))
}

/// POST /auth/logout
pub async fn logout(session: Session) -> Json<ApiResponse<MessageResponse>> {
    let _ = session.flush().await;
    Json(ApiResponse::success(MessageResponse::new("Logged out")))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
) -> Result<Json<ApiResponse<AccountView>>, ApiError> {
    let account = state.shared.auth_service.account(agent_id).await?;
    Ok(Json(ApiResponse::success(account)))
}

/// PUT /auth/profile
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Extension(CurrentAgent(agent_id)): Extension<CurrentAgent>,
    Json(payload): Json<ProfileRequest>,
) -> Result<Json<ApiResponse<Agent>>, ApiError> {
    let update = ProfileUpdate {
        first_name: payload.first_name,
        last_name: payload.last_name,
        insurance_types: payload
            .insurance_types
            .as_deref()
            .map(validate_focus_list)
            .transpose()?,
        default_tone: payload
            .default_tone
            .as_deref()
            .map(validate_tone)
            .transpose()?,
    };

    let agent = state
        .shared
        .auth_service
        .update_profile(agent_id, update)
        .await?;
    Ok(Json(ApiResponse::success(agent)))
}

// ============================================================================
// Helpers
// ============================================================================

async fn start_session(session: &Session, agent: &Agent) -> Result<(), ApiError> {
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;
    session
        .insert(SESSION_AGENT_KEY, agent.id.value())
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))
}
