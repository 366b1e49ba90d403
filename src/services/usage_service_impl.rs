//! `SeaORM` implementation of the `UsageService` trait.

use async_trait::async_trait;

use crate::db::Store;
use crate::domain::AgentId;
use crate::models::UsageSummary;
use crate::services::usage_service::{RECENT_USAGE_LIMIT, UsageError, UsageService};

pub struct SeaOrmUsageService {
    store: Store,
}

impl SeaOrmUsageService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UsageService for SeaOrmUsageService {
    async fn summary(&self, agent_id: AgentId) -> Result<UsageSummary, UsageError> {
        Ok(self.store.usage_summary(agent_id, RECENT_USAGE_LIMIT).await?)
    }

    async fn summary_for_email(&self, email: &str) -> Result<UsageSummary, UsageError> {
        let agent = self
            .store
            .get_agent_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(UsageError::AgentNotFound)?;
        self.summary(agent.id).await
    }
}
