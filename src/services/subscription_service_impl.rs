//! `SeaORM` implementation of the `SubscriptionService` trait.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::billing::{parse_event, verify_signature};
use crate::clients::{
    BillingNotConfigured, BillingProvider, CheckoutParams, CreateCustomerParams, PlanInterval,
};
use crate::config::BillingConfig;
use crate::db::{EventRecord, Store};
use crate::domain::entitlement::{BillingTransition, TRIAL_DAYS};
use crate::domain::{AgentId, SubscriptionStatus};
use crate::models::Agent;
use crate::services::subscription_service::{
    CheckoutView, Plan, Pricing, SubscriptionError, SubscriptionService, SubscriptionView,
    WebhookReceipt, trial_description,
};

pub struct SeaOrmSubscriptionService {
    store: Store,
    provider: Arc<dyn BillingProvider>,
    config: Arc<BillingConfig>,
    public_base_url: String,
}

impl SeaOrmSubscriptionService {
    #[must_use]
    pub fn new(
        store: Store,
        provider: Arc<dyn BillingProvider>,
        config: Arc<BillingConfig>,
        public_base_url: &str,
    ) -> Self {
        Self {
            store,
            provider,
            config,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn agent(&self, agent_id: AgentId) -> Result<Agent, SubscriptionError> {
        self.store
            .get_agent(agent_id)
            .await?
            .ok_or(SubscriptionError::AgentNotFound)
    }

    /// Bounds a provider call by the configured timeout.
    async fn call_provider<T, F>(&self, call: F) -> Result<T, SubscriptionError>
    where
        F: Future<Output = anyhow::Result<T>> + Send,
        T: Send,
    {
        let timeout_secs = self.config.request_timeout_seconds;
        match tokio::time::timeout(Duration::from_secs(timeout_secs), call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) if err.downcast_ref::<BillingNotConfigured>().is_some() => {
                Err(SubscriptionError::NotConfigured)
            }
            Ok(Err(err)) => {
                warn!(error = %err, "Billing provider call failed");
                Err(SubscriptionError::Provider(err.to_string()))
            }
            Err(_) => Err(SubscriptionError::Provider(format!(
                "timed out after {timeout_secs}s"
            ))),
        }
    }

    async fn transition(
        &self,
        agent_id: AgentId,
        transition: &BillingTransition,
    ) -> Result<SubscriptionView, SubscriptionError> {
        let (agent, outcome) = self
            .store
            .apply_agent_transition(agent_id, transition)
            .await?
            .ok_or(SubscriptionError::AgentNotFound)?;

        info!(
            agent_id = %agent_id,
            outcome = outcome.as_str(),
            status = agent.subscription.status.as_str(),
            "Subscription change requested by agent"
        );
        Ok(SubscriptionView::from_fields(&agent.subscription, Utc::now()))
    }

    fn price_for(&self, plan: PlanInterval) -> i64 {
        match plan {
            PlanInterval::Monthly => self.config.monthly_price_cents,
            PlanInterval::Annual => self.config.annual_price_cents,
        }
    }
}

#[async_trait]
impl SubscriptionService for SeaOrmSubscriptionService {
    fn pricing(&self) -> Pricing {
        let plans = [
            (PlanInterval::Monthly, "monthly"),
            (PlanInterval::Annual, "annual"),
        ]
        .into_iter()
        .map(|(plan, plan_type)| Plan {
            plan_type,
            name: format!("{} Plan", plan.label()),
            price_cents: self.price_for(plan),
            currency: self.config.currency.clone(),
            interval: plan.provider_interval(),
        })
        .collect();

        Pricing {
            plans,
            trial_days: TRIAL_DAYS,
            trial_description: trial_description(),
        }
    }

    async fn status(&self, agent_id: AgentId) -> Result<SubscriptionView, SubscriptionError> {
        let agent = self.agent(agent_id).await?;
        Ok(SubscriptionView::from_fields(&agent.subscription, Utc::now()))
    }

    async fn checkout(
        &self,
        agent_id: AgentId,
        plan: PlanInterval,
    ) -> Result<CheckoutView, SubscriptionError> {
        let agent = self.agent(agent_id).await?;

        let customer_id = if let Some(existing) = agent.billing_customer_id.clone() {
            existing
        } else {
            let name = agent.full_name();
            let created = self
                .call_provider(self.provider.create_customer(CreateCustomerParams {
                    email: &agent.email,
                    name: &name,
                    agent_id: agent_id.value(),
                }))
                .await?;
            self.store.set_billing_customer(agent_id, &created).await?;
            created
        };

        let success_url = format!(
            "{}/dashboard?session_id={{CHECKOUT_SESSION_ID}}",
            self.public_base_url
        );
        let cancel_url = format!("{}/pricing", self.public_base_url);

        let session = self
            .call_provider(self.provider.create_checkout_session(CheckoutParams {
                customer_id: &customer_id,
                agent_id: agent_id.value(),
                plan,
                unit_amount_cents: self.price_for(plan),
                currency: &self.config.currency,
                success_url: &success_url,
                cancel_url: &cancel_url,
            }))
            .await?;

        info!(agent_id = %agent_id, plan = plan.label(), session_id = %session.id, "Checkout session created");
        Ok(CheckoutView {
            checkout_url: session.url,
            session_id: session.id,
        })
    }

    async fn portal(&self, agent_id: AgentId) -> Result<String, SubscriptionError> {
        let agent = self.agent(agent_id).await?;
        let customer_id = agent.billing_customer_id.ok_or_else(|| {
            SubscriptionError::NotFound("No billing account found for this agent".to_string())
        })?;

        let return_url = format!("{}/dashboard", self.public_base_url);
        self.call_provider(
            self.provider
                .create_portal_session(&customer_id, &return_url),
        )
        .await
    }

    async fn cancel(&self, agent_id: AgentId) -> Result<SubscriptionView, SubscriptionError> {
        let agent = self.agent(agent_id).await?;
        if agent.subscription.status != SubscriptionStatus::Active {
            return Err(SubscriptionError::InvalidState(
                "No active subscription to cancel".to_string(),
            ));
        }
        let subscription_id = agent.billing_subscription_id.ok_or_else(|| {
            SubscriptionError::NotFound("No billing subscription found for this agent".to_string())
        })?;

        self.call_provider(
            self.provider
                .set_cancel_at_period_end(&subscription_id, true),
        )
        .await?;

        self.transition(agent_id, &BillingTransition::CancelAtPeriodEnd)
            .await
    }

    async fn reactivate(
        &self,
        agent_id: AgentId,
    ) -> Result<SubscriptionView, SubscriptionError> {
        let agent = self.agent(agent_id).await?;
        let now = Utc::now();
        let fields = &agent.subscription;

        let reactivatable = match fields.status {
            SubscriptionStatus::Active => fields.cancel_at_period_end,
            SubscriptionStatus::Cancelled => fields.subscription_end.is_some_and(|end| end > now),
            SubscriptionStatus::Trial | SubscriptionStatus::Expired => false,
        };
        if !reactivatable {
            return Err(SubscriptionError::InvalidState(
                "Subscription cannot be reactivated".to_string(),
            ));
        }

        if let Some(subscription_id) = agent.billing_subscription_id.as_deref() {
            self.call_provider(
                self.provider
                    .set_cancel_at_period_end(subscription_id, false),
            )
            .await?;
        }

        self.transition(agent_id, &BillingTransition::Reactivate { now })
            .await
    }

    async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<WebhookReceipt, SubscriptionError> {
        verify_signature(
            payload,
            signature,
            &self.config.webhook_secret,
            Utc::now().timestamp(),
            self.config.signature_tolerance_seconds,
        )?;
        let event = parse_event(payload)?;
        let transition = event.to_transition();

        let outcome = self
            .store
            .record_billing_event(
                EventRecord {
                    event_id: &event.id,
                    event_type: &event.event_type,
                    agent_id: event.agent_id,
                    customer_id: event.customer_id.as_deref(),
                    subscription_id: event.subscription_id.as_deref(),
                },
                transition.as_ref(),
            )
            .await?;

        metrics::counter!(
            "billing_events_total",
            "kind" => event.kind.label(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
        info!(
            event_id = %event.id,
            event_type = %event.event_type,
            agent_id = ?event.agent_id,
            outcome = outcome.as_str(),
            "Processed billing event"
        );

        Ok(WebhookReceipt::new(event.id, event.event_type, outcome))
    }
}
