use anyhow::{Context, Result};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::{debug, info};

use super::agent::write_subscription;
use super::is_unique_violation;
use crate::domain::entitlement::{self, BillingTransition, TransitionOutcome};
use crate::entities::{agents, billing_events};
use crate::models::Agent;

/// Identity of one provider event, as recorded for deduplication.
#[derive(Debug, Clone, Copy)]
pub struct EventRecord<'a> {
    pub event_id: &'a str,
    pub event_type: &'a str,
    pub agent_id: Option<i32>,
    pub customer_id: Option<&'a str>,
    pub subscription_id: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// Event id seen before; nothing was changed.
    Duplicate,
    Applied,
    Ignored,
}

impl WebhookOutcome {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Applied => "applied",
            Self::Ignored => "ignored",
        }
    }
}

pub struct BillingEventRepository {
    conn: DatabaseConnection,
}

impl BillingEventRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Applies `transition` to the event's agent and records the event id,
    /// both in one transaction. Replays of a recorded id change nothing.
    pub async fn record_and_apply(
        &self,
        record: EventRecord<'_>,
        transition: Option<&BillingTransition>,
    ) -> Result<WebhookOutcome> {
        let txn = self.conn.begin().await?;

        let seen = billing_events::Entity::find()
            .filter(billing_events::Column::EventId.eq(record.event_id))
            .one(&txn)
            .await
            .context("Failed to query billing events")?;
        if seen.is_some() {
            txn.rollback().await?;
            debug!(event_id = record.event_id, "Billing event already processed");
            return Ok(WebhookOutcome::Duplicate);
        }

        let agent = match record.agent_id {
            Some(id) => agents::Entity::find_by_id(id).one(&txn).await?,
            None => None,
        };

        let outcome = match agent {
            Some(model) => {
                let mut current = Agent::from(model.clone());
                let transitioned = transition.map_or(TransitionOutcome::Ignored, |t| {
                    entitlement::apply(&mut current.subscription, t)
                });

                let customer_changed = record
                    .customer_id
                    .is_some_and(|id| model.billing_customer_id.as_deref() != Some(id));
                let subscription_changed = record
                    .subscription_id
                    .is_some_and(|id| model.billing_subscription_id.as_deref() != Some(id));

                if transitioned == TransitionOutcome::Applied
                    || customer_changed
                    || subscription_changed
                {
                    let mut active = write_subscription(model, &current.subscription);
                    if let Some(customer_id) = record.customer_id {
                        active.billing_customer_id = Set(Some(customer_id.to_string()));
                    }
                    if let Some(subscription_id) = record.subscription_id {
                        active.billing_subscription_id = Set(Some(subscription_id.to_string()));
                    }
                    active
                        .update(&txn)
                        .await
                        .context("Failed to update agent from billing event")?;
                }

                if transitioned == TransitionOutcome::Applied {
                    info!(
                        agent_id = %current.id,
                        event_type = record.event_type,
                        status = current.subscription.status.as_str(),
                        "Subscription state changed"
                    );
                    WebhookOutcome::Applied
                } else {
                    WebhookOutcome::Ignored
                }
            }
            None => WebhookOutcome::Ignored,
        };

        let inserted = billing_events::ActiveModel {
            event_id: Set(record.event_id.to_string()),
            event_type: Set(record.event_type.to_string()),
            agent_id: Set(record.agent_id),
            outcome: Set(outcome.as_str().to_string()),
            received_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        match inserted {
            Ok(_) => {
                txn.commit().await.context("Failed to commit billing event")?;
                Ok(outcome)
            }
            Err(err) if is_unique_violation(&err) => {
                txn.rollback().await?;
                Ok(WebhookOutcome::Duplicate)
            }
            Err(err) => Err(err).context("Failed to record billing event"),
        }
    }
}
