use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::billing::WebhookError;
use crate::domain::entitlement::DenialReason;
use crate::services::{AuthError, ContentError, ImageError, SubscriptionError, UsageError};

#[derive(Debug)]
pub enum ApiError {
    ValidationError(String),

    NotAuthenticated(String),

    NotEntitled(DenialReason),

    NotFound(String),

    Forbidden(String),

    Conflict(String),

    UpstreamGeneration(String),

    BillingProvider(String),

    InvalidSignature(String),

    NotConfigured(String),

    DatabaseError(String),

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::NotAuthenticated(msg) => write!(f, "Not authenticated: {msg}"),
            Self::NotEntitled(reason) => write!(f, "Not entitled: {}", reason.code()),
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Forbidden(msg) => write!(f, "Forbidden: {msg}"),
            Self::Conflict(msg) => write!(f, "Conflict: {msg}"),
            Self::UpstreamGeneration(msg) => write!(f, "Generation provider error: {msg}"),
            Self::BillingProvider(msg) => write!(f, "Billing provider error: {msg}"),
            Self::InvalidSignature(msg) => write!(f, "Invalid signature: {msg}"),
            Self::NotConfigured(msg) => write!(f, "Not configured: {msg}"),
            Self::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            Self::InternalError(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl ApiError {
    /// Stable machine-readable category sent as `code`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::ValidationError(_) => "validation_error",
            Self::NotAuthenticated(_) => "not_authenticated",
            Self::NotEntitled(reason) => reason.code(),
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::UpstreamGeneration(_) => "upstream_generation_error",
            Self::BillingProvider(_) => "billing_provider_error",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::NotConfigured(_) => "not_configured",
            Self::DatabaseError(_) => "database_error",
            Self::InternalError(_) => "internal_error",
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) | Self::InvalidSignature(_) => StatusCode::BAD_REQUEST,
            Self::NotAuthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotEntitled(_) | Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::UpstreamGeneration(_) | Self::BillingProvider(_) => StatusCode::BAD_GATEWAY,
            Self::NotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::DatabaseError(_) | Self::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    pub fn not_found(resource: &str, id: impl fmt::Display) -> Self {
        Self::NotFound(format!("{resource} {id} not found"))
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::InternalError(msg.into())
    }

    pub fn unauthenticated() -> Self {
        Self::NotAuthenticated("Authentication required".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            Self::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "A database error occurred".to_string()
            }
            Self::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
            Self::UpstreamGeneration(msg) => {
                tracing::warn!("Generation provider error: {}", msg);
                format!("Content generation failed: {msg}")
            }
            Self::BillingProvider(msg) => {
                tracing::warn!("Billing provider error: {}", msg);
                "The billing provider is unavailable".to_string()
            }
            Self::NotEntitled(reason) => reason.message().to_string(),
            Self::ValidationError(msg)
            | Self::NotAuthenticated(msg)
            | Self::NotFound(msg)
            | Self::Forbidden(msg)
            | Self::Conflict(msg)
            | Self::InvalidSignature(msg)
            | Self::NotConfigured(msg) => msg.clone(),
        };

        let body = ApiResponse::<()>::failure(self.code(), message);
        (self.status(), Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalError(err.to_string())
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::NotAuthenticated(err.to_string()),
            AuthError::AgentNotFound => Self::NotAuthenticated("Agent no longer exists".into()),
            AuthError::EmailTaken => Self::Conflict(err.to_string()),
            AuthError::Validation(msg) => Self::ValidationError(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

impl From<ContentError> for ApiError {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::Validation(msg) => Self::ValidationError(msg),
            ContentError::ScheduleNotFound(_) | ContentError::WeekNotGenerated { .. } => {
                Self::NotFound(err.to_string())
            }
            ContentError::AgentNotFound => Self::NotAuthenticated("Agent no longer exists".into()),
            ContentError::Upstream(inner) => Self::UpstreamGeneration(inner.to_string()),
            ContentError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

impl From<ImageError> for ApiError {
    fn from(err: ImageError) -> Self {
        match err {
            ImageError::PostNotFound(_)
            | ImageError::ScheduleNotFound(_)
            | ImageError::NoImage(_) => Self::NotFound(err.to_string()),
            ImageError::Validation(msg) => Self::ValidationError(msg),
            ImageError::Upstream(inner) => Self::UpstreamGeneration(inner.to_string()),
            ImageError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::AgentNotFound => {
                Self::NotAuthenticated("Agent no longer exists".into())
            }
            SubscriptionError::NotFound(msg) => Self::NotFound(msg),
            SubscriptionError::InvalidState(msg) => Self::Conflict(msg),
            SubscriptionError::Webhook(WebhookError::NotConfigured)
            | SubscriptionError::NotConfigured => {
                Self::NotConfigured("Billing is not configured".to_string())
            }
            SubscriptionError::Webhook(WebhookError::InvalidPayload(msg)) => {
                Self::ValidationError(format!("Invalid webhook payload: {msg}"))
            }
            SubscriptionError::Webhook(inner) => Self::InvalidSignature(inner.to_string()),
            SubscriptionError::Provider(msg) => Self::BillingProvider(msg),
            SubscriptionError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

impl From<UsageError> for ApiError {
    fn from(err: UsageError) -> Self {
        match err {
            UsageError::AgentNotFound => Self::NotAuthenticated("Agent no longer exists".into()),
            UsageError::Database(msg) => Self::DatabaseError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::GenerationError;
    use crate::domain::ScheduleId;

    #[test]
    fn service_errors_map_to_stable_codes() {
        let cases: Vec<(ApiError, &str, StatusCode)> = vec![
            (
                ContentError::Validation("bad tone".into()).into(),
                "validation_error",
                StatusCode::BAD_REQUEST,
            ),
            (
                ContentError::ScheduleNotFound(ScheduleId::new(3)).into(),
                "not_found",
                StatusCode::NOT_FOUND,
            ),
            (
                ContentError::Upstream(GenerationError::Timeout(5)).into(),
                "upstream_generation_error",
                StatusCode::BAD_GATEWAY,
            ),
            (
                AuthError::EmailTaken.into(),
                "conflict",
                StatusCode::CONFLICT,
            ),
            (
                AuthError::InvalidCredentials.into(),
                "not_authenticated",
                StatusCode::UNAUTHORIZED,
            ),
            (
                SubscriptionError::Webhook(WebhookError::SignatureMismatch).into(),
                "invalid_signature",
                StatusCode::BAD_REQUEST,
            ),
            (
                SubscriptionError::Webhook(WebhookError::NotConfigured).into(),
                "not_configured",
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ApiError::NotEntitled(DenialReason::TrialExpired),
                "trial_expired",
                StatusCode::FORBIDDEN,
            ),
            (
                ApiError::NotEntitled(DenialReason::NoSubscription),
                "no_subscription",
                StatusCode::FORBIDDEN,
            ),
        ];

        for (err, code, status) in cases {
            assert_eq!(err.code(), code, "{err}");
            assert_eq!(err.status(), status, "{err}");
        }
    }
}
