use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use super::is_unique_violation;
use crate::config::SecurityConfig;
use crate::db::{decode_focus_list, encode_focus_list};
use crate::domain::entitlement::{
    self, BillingTransition, SubscriptionFields, TransitionOutcome,
};
use crate::domain::{AgentId, InsuranceFocus, Tone};
use crate::entities::agents;
use crate::models::Agent;

impl From<agents::Model> for Agent {
    fn from(model: agents::Model) -> Self {
        Self {
            id: AgentId::new(model.id),
            email: model.email,
            first_name: model.first_name,
            last_name: model.last_name,
            subscription: SubscriptionFields {
                status: model.subscription_status,
                trial_start: model.trial_start,
                trial_end: model.trial_end,
                subscription_start: model.subscription_start,
                subscription_end: model.subscription_end,
                cancel_at_period_end: model.cancel_at_period_end,
            },
            billing_customer_id: model.billing_customer_id,
            billing_subscription_id: model.billing_subscription_id,
            default_tone: model.default_tone,
            insurance_types: decode_focus_list(&model.insurance_types),
            created_at: model.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAgent {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub now: DateTime<Utc>,
}

/// Partial profile update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub insurance_types: Option<Vec<InsuranceFocus>>,
    pub default_tone: Option<Tone>,
}

pub struct AgentRepository {
    conn: DatabaseConnection,
}

impl AgentRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Creates a trial agent. Returns `None` if the email is taken.
    pub async fn create(&self, agent: NewAgent) -> Result<Option<Agent>> {
        let trial = SubscriptionFields::new_trial(agent.now);

        let active = agents::ActiveModel {
            email: Set(agent.email),
            password_hash: Set(agent.password_hash),
            first_name: Set(agent.first_name),
            last_name: Set(agent.last_name),
            subscription_status: Set(trial.status),
            trial_start: Set(trial.trial_start),
            trial_end: Set(trial.trial_end),
            subscription_start: Set(None),
            subscription_end: Set(None),
            cancel_at_period_end: Set(false),
            billing_customer_id: Set(None),
            billing_subscription_id: Set(None),
            default_tone: Set(Tone::default()),
            insurance_types: Set(encode_focus_list(&[])),
            created_at: Set(agent.now),
            updated_at: Set(agent.now),
            ..Default::default()
        };

        match active.insert(&self.conn).await {
            Ok(model) => Ok(Some(Agent::from(model))),
            Err(err) if is_unique_violation(&err) => Ok(None),
            Err(err) => Err(err).context("Failed to insert agent"),
        }
    }

    pub async fn get(&self, id: AgentId) -> Result<Option<Agent>> {
        let agent = agents::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query agent by ID")?;

        Ok(agent.map(Agent::from))
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Agent>> {
        let agent = agents::Entity::find()
            .filter(agents::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query agent by email")?;

        Ok(agent.map(Agent::from))
    }

    /// Agent plus stored password hash, for login only.
    pub async fn get_with_password(&self, email: &str) -> Result<Option<(Agent, String)>> {
        let agent = agents::Entity::find()
            .filter(agents::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query agent for login")?;

        Ok(agent.map(|model| {
            let password_hash = model.password_hash.clone();
            (Agent::from(model), password_hash)
        }))
    }

    pub async fn update_profile(&self, id: AgentId, update: ProfileUpdate) -> Result<Option<Agent>> {
        let Some(model) = agents::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query agent for profile update")?
        else {
            return Ok(None);
        };

        let mut active: agents::ActiveModel = model.into();
        if let Some(first_name) = update.first_name {
            active.first_name = Set(first_name);
        }
        if let Some(last_name) = update.last_name {
            active.last_name = Set(last_name);
        }
        if let Some(types) = update.insurance_types {
            active.insurance_types = Set(encode_focus_list(&types));
        }
        if let Some(tone) = update.default_tone {
            active.default_tone = Set(tone);
        }
        active.updated_at = Set(Utc::now());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to update agent profile")?;
        Ok(Some(Agent::from(model)))
    }

    pub async fn set_billing_customer(&self, id: AgentId, customer_id: &str) -> Result<()> {
        let model = agents::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Agent not found: {id}"))?;

        let mut active: agents::ActiveModel = model.into();
        active.billing_customer_id = Set(Some(customer_id.to_string()));
        active.updated_at = Set(Utc::now());
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Reads, transitions and writes back one agent inside a transaction.
    pub async fn apply_transition(
        &self,
        id: AgentId,
        transition: &BillingTransition,
    ) -> Result<Option<(Agent, TransitionOutcome)>> {
        let txn = self.conn.begin().await?;

        let Some(model) = agents::Entity::find_by_id(id.value()).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut agent = Agent::from(model.clone());
        let outcome = entitlement::apply(&mut agent.subscription, transition);
        if outcome == TransitionOutcome::Applied {
            write_subscription(model, &agent.subscription)
                .update(&txn)
                .await
                .context("Failed to persist subscription change")?;
        }

        txn.commit().await?;
        Ok(Some((agent, outcome)))
    }

    pub async fn save_subscription(&self, id: AgentId, fields: &SubscriptionFields) -> Result<()> {
        let model = agents::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Agent not found: {id}"))?;

        write_subscription(model, fields).update(&self.conn).await?;
        Ok(())
    }
}

/// Active model carrying every subscription column from `fields`.
pub(crate) fn write_subscription(
    model: agents::Model,
    fields: &SubscriptionFields,
) -> agents::ActiveModel {
    let mut active: agents::ActiveModel = model.into();
    active.subscription_status = Set(fields.status);
    active.trial_start = Set(fields.trial_start);
    active.trial_end = Set(fields.trial_end);
    active.subscription_start = Set(fields.subscription_start);
    active.subscription_end = Set(fields.subscription_end);
    active.cancel_at_period_end = Set(fields.cancel_at_period_end);
    active.updated_at = Set(Utc::now());
    active
}

/// Hash a password using Argon2id with the configured cost parameters.
pub fn hash_password(password: &str, config: &SecurityConfig) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);

    let params = Params::new(
        config.argon2_memory_cost_kib,
        config.argon2_time_cost,
        config.argon2_parallelism,
        None,
    )
    .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))?;

    Ok(hash.to_string())
}

/// Parameters are read back from the PHC string, so old hashes keep verifying.
pub fn verify_password(password_hash: &str, password: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(password_hash)
        .map_err(|e| anyhow::anyhow!("Invalid password hash format: {e}"))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
