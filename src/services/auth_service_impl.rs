//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::SecurityConfig;
use crate::db::repositories::agent::{hash_password, verify_password};
use crate::db::{NewAgent, ProfileUpdate, Store};
use crate::domain::AgentId;
use crate::domain::entitlement::EntitlementSnapshot;
use crate::models::Agent;
use crate::services::auth_service::{
    AccountView, AuthError, AuthService, Registration, normalize_email, validate_password,
};

const MAX_NAME_LENGTH: usize = 100;

pub struct SeaOrmAuthService {
    store: Store,
    security: Arc<SecurityConfig>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: Arc<SecurityConfig>) -> Self {
        Self { store, security }
    }
}

fn clean_name(value: &str, field: &str) -> Result<String, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(AuthError::Validation(format!(
            "{field} must be {MAX_NAME_LENGTH} characters or less"
        )));
    }
    Ok(value.to_string())
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, registration: Registration) -> Result<Agent, AuthError> {
        let email = normalize_email(&registration.email)?;
        validate_password(&registration.password, self.security.min_password_length)?;
        let first_name = clean_name(&registration.first_name, "First name")?;
        let last_name = clean_name(&registration.last_name, "Last name")?;

        if self.store.get_agent_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let security = Arc::clone(&self.security);
        let password = registration.password;
        let password_hash =
            tokio::task::spawn_blocking(move || hash_password(&password, &security))
                .await
                .map_err(|e| AuthError::Internal(format!("Hashing task failed: {e}")))??;

        let agent = self
            .store
            .create_agent(NewAgent {
                email,
                password_hash,
                first_name,
                last_name,
                now: Utc::now(),
            })
            .await?
            .ok_or(AuthError::EmailTaken)?;

        info!(agent_id = %agent.id, "Agent registered");
        Ok(agent)
    }

    async fn login(&self, email: &str, password: &str) -> Result<Agent, AuthError> {
        let email = email.trim().to_lowercase();
        let Some((agent, password_hash)) = self.store.get_agent_with_password(&email).await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        let password = password.to_string();
        let is_valid =
            tokio::task::spawn_blocking(move || verify_password(&password_hash, &password))
                .await
                .map_err(|e| AuthError::Internal(format!("Verification task failed: {e}")))??;

        if !is_valid {
            warn!(agent_id = %agent.id, "Failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        Ok(agent)
    }

    async fn account(&self, agent_id: AgentId) -> Result<AccountView, AuthError> {
        let agent = self
            .store
            .get_agent(agent_id)
            .await?
            .ok_or(AuthError::AgentNotFound)?;

        let entitlement = EntitlementSnapshot::evaluate(&agent.subscription, Utc::now());
        Ok(AccountView { agent, entitlement })
    }

    async fn update_profile(
        &self,
        agent_id: AgentId,
        mut update: ProfileUpdate,
    ) -> Result<Agent, AuthError> {
        if let Some(first_name) = update.first_name.take() {
            update.first_name = Some(clean_name(&first_name, "First name")?);
        }
        if let Some(last_name) = update.last_name.take() {
            update.last_name = Some(clean_name(&last_name, "Last name")?);
        }

        self.store
            .update_agent_profile(agent_id, update)
            .await?
            .ok_or(AuthError::AgentNotFound)
    }
}
