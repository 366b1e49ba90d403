use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::domain::AgentId;
use crate::entities::api_usage;
use crate::models::usage::{NewUsage, UsageEntry, UsageSummary};

impl From<api_usage::Model> for UsageEntry {
    fn from(model: api_usage::Model) -> Self {
        Self {
            endpoint: model.endpoint,
            tokens_used: model.tokens_used,
            cost: model.cost,
            created_at: model.created_at,
        }
    }
}

/// Appends one ledger line on whatever connection or transaction is given.
pub async fn insert_usage<C>(
    conn: &C,
    agent_id: AgentId,
    usage: &NewUsage,
    now: DateTime<Utc>,
) -> Result<()>
where
    C: ConnectionTrait,
{
    api_usage::ActiveModel {
        agent_id: Set(agent_id.value()),
        endpoint: Set(usage.endpoint.to_string()),
        tokens_used: Set(usage.tokens_used),
        cost: Set(usage.cost),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
    .context("Failed to record API usage")?;

    Ok(())
}

pub struct UsageRepository {
    conn: DatabaseConnection,
}

impl UsageRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn summary(&self, agent_id: AgentId, recent: u64) -> Result<UsageSummary> {
        let totals: Option<(i64, Option<i64>, Option<f64>)> = api_usage::Entity::find()
            .select_only()
            .column_as(api_usage::Column::Id.count(), "calls")
            .column_as(api_usage::Column::TokensUsed.sum(), "tokens")
            .column_as(api_usage::Column::Cost.sum(), "cost")
            .filter(api_usage::Column::AgentId.eq(agent_id.value()))
            .into_tuple()
            .one(&self.conn)
            .await
            .context("Failed to aggregate API usage")?;

        let recent_rows = api_usage::Entity::find()
            .filter(api_usage::Column::AgentId.eq(agent_id.value()))
            .order_by_desc(api_usage::Column::CreatedAt)
            .order_by_desc(api_usage::Column::Id)
            .limit(recent)
            .all(&self.conn)
            .await
            .context("Failed to list recent API usage")?;

        let (calls, tokens, cost) = totals.unwrap_or((0, None, None));

        Ok(UsageSummary {
            total_calls: u64::try_from(calls).unwrap_or(0),
            total_tokens: tokens.unwrap_or(0),
            total_cost: cost.unwrap_or(0.0),
            recent: recent_rows.into_iter().map(UsageEntry::from).collect(),
        })
    }
}
