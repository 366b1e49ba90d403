//! Domain service for the per-agent API usage ledger.

use thiserror::Error;

use crate::domain::AgentId;
use crate::models::UsageSummary;

/// Number of ledger lines returned with a summary.
pub const RECENT_USAGE_LIMIT: u64 = 20;

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Agent not found")]
    AgentNotFound,

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for UsageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait UsageService: Send + Sync {
    async fn summary(&self, agent_id: AgentId) -> Result<UsageSummary, UsageError>;

    /// Summary looked up by login email, for operator tooling.
    async fn summary_for_email(&self, email: &str) -> Result<UsageSummary, UsageError>;
}
