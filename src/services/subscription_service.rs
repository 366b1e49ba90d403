//! Domain service for trials, subscriptions and billing events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::billing::WebhookError;
use crate::clients::PlanInterval;
use crate::db::WebhookOutcome;
use crate::domain::AgentId;
use crate::domain::SubscriptionStatus;
use crate::domain::entitlement::{self, DenialReason, SubscriptionFields, TRIAL_DAYS};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Agent not found")]
    AgentNotFound,

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidState(String),

    #[error("Webhook rejected: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Billing is not configured")]
    NotConfigured,

    #[error("Billing provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for SubscriptionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub plan_type: &'static str,
    pub name: String,
    pub price_cents: i64,
    pub currency: String,
    pub interval: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct Pricing {
    pub plans: Vec<Plan>,
    pub trial_days: i64,
    pub trial_description: String,
}

/// Everything the client shows about an agent's subscription.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionView {
    pub status: SubscriptionStatus,
    pub trial_start: DateTime<Utc>,
    pub trial_end: DateTime<Utc>,
    pub trial_days_remaining: i64,
    pub subscription_start: Option<DateTime<Utc>>,
    pub subscription_end: Option<DateTime<Utc>>,
    pub cancel_at_period_end: bool,
    pub can_generate_content: bool,
    pub reason: Option<DenialReason>,
}

impl SubscriptionView {
    #[must_use]
    pub fn from_fields(fields: &SubscriptionFields, now: DateTime<Utc>) -> Self {
        Self {
            status: fields.status,
            trial_start: fields.trial_start,
            trial_end: fields.trial_end,
            trial_days_remaining: entitlement::days_remaining(fields, now),
            subscription_start: fields.subscription_start,
            subscription_end: fields.subscription_end,
            cancel_at_period_end: fields.cancel_at_period_end,
            can_generate_content: entitlement::is_entitled(fields, now),
            reason: entitlement::denial_reason(fields, now),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutView {
    pub checkout_url: String,
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookReceipt {
    pub event_id: String,
    pub event_type: String,
    pub outcome: &'static str,
}

impl WebhookReceipt {
    #[must_use]
    pub fn new(event_id: String, event_type: String, outcome: WebhookOutcome) -> Self {
        Self {
            event_id,
            event_type,
            outcome: outcome.as_str(),
        }
    }
}

#[async_trait::async_trait]
pub trait SubscriptionService: Send + Sync {
    fn pricing(&self) -> Pricing;

    async fn status(&self, agent_id: AgentId) -> Result<SubscriptionView, SubscriptionError>;

    /// Opens a hosted checkout, creating the billing customer on first use.
    async fn checkout(
        &self,
        agent_id: AgentId,
        plan: PlanInterval,
    ) -> Result<CheckoutView, SubscriptionError>;

    /// Returns the self-service portal URL.
    async fn portal(&self, agent_id: AgentId) -> Result<String, SubscriptionError>;

    /// Cancels at the end of the paid period; the agent stays entitled until then.
    async fn cancel(&self, agent_id: AgentId) -> Result<SubscriptionView, SubscriptionError>;

    async fn reactivate(&self, agent_id: AgentId)
    -> Result<SubscriptionView, SubscriptionError>;

    /// Verifies, decodes and applies one webhook delivery.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::Webhook`] before touching any state when
    /// the signature or payload is bad.
    async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookReceipt, SubscriptionError>;
}

#[must_use]
pub fn trial_description() -> String {
    format!("{TRIAL_DAYS}-day free trial with full access to content generation")
}
