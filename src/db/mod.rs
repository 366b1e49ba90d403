use anyhow::Result;
use chrono::NaiveDate;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::content::PostDraft;
use crate::domain::entitlement::{BillingTransition, SubscriptionFields, TransitionOutcome};
use crate::domain::{AgentId, InsuranceFocus, PostId, ScheduleId};
use crate::models::usage::NewUsage;
use crate::models::{Agent, Post, Schedule, UsageSummary};

pub mod migrator;
pub mod repositories;

pub use repositories::agent::{NewAgent, ProfileUpdate};
pub use repositories::billing_event::{EventRecord, WebhookOutcome};
pub use repositories::schedule::{CreateOutcome, NewSchedule};

const BUSY_TIMEOUT_SECS: u64 = 5;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // Every pooled connection to `:memory:` would open its own empty database.
        let in_memory = db_url.contains(":memory:");
        let (max_connections, min_connections) = if in_memory {
            (1, 1)
        } else {
            (max_connections, min_connections)
        };

        if !in_memory {
            let path_str = db_url
                .trim_start_matches("sqlite://")
                .trim_start_matches("sqlite:");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(30))
            .sqlx_logging(false)
            .map_sqlx_sqlite_opts(|sqlite| {
                sqlite
                    .foreign_keys(true)
                    .busy_timeout(Duration::from_secs(BUSY_TIMEOUT_SECS))
            });
        if !in_memory {
            opt.idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn agent_repo(&self) -> repositories::agent::AgentRepository {
        repositories::agent::AgentRepository::new(self.conn.clone())
    }

    fn schedule_repo(&self) -> repositories::schedule::ScheduleRepository {
        repositories::schedule::ScheduleRepository::new(self.conn.clone())
    }

    fn usage_repo(&self) -> repositories::usage::UsageRepository {
        repositories::usage::UsageRepository::new(self.conn.clone())
    }

    fn billing_event_repo(&self) -> repositories::billing_event::BillingEventRepository {
        repositories::billing_event::BillingEventRepository::new(self.conn.clone())
    }

    // Agents

    /// `None` when the email is already registered.
    pub async fn create_agent(&self, agent: NewAgent) -> Result<Option<Agent>> {
        self.agent_repo().create(agent).await
    }

    pub async fn get_agent(&self, id: AgentId) -> Result<Option<Agent>> {
        self.agent_repo().get(id).await
    }

    pub async fn get_agent_by_email(&self, email: &str) -> Result<Option<Agent>> {
        self.agent_repo().get_by_email(email).await
    }

    pub async fn get_agent_with_password(&self, email: &str) -> Result<Option<(Agent, String)>> {
        self.agent_repo().get_with_password(email).await
    }

    pub async fn update_agent_profile(
        &self,
        id: AgentId,
        update: ProfileUpdate,
    ) -> Result<Option<Agent>> {
        self.agent_repo().update_profile(id, update).await
    }

    pub async fn set_billing_customer(&self, id: AgentId, customer_id: &str) -> Result<()> {
        self.agent_repo().set_billing_customer(id, customer_id).await
    }

    pub async fn apply_agent_transition(
        &self,
        id: AgentId,
        transition: &BillingTransition,
    ) -> Result<Option<(Agent, TransitionOutcome)>> {
        self.agent_repo().apply_transition(id, transition).await
    }

    pub async fn save_subscription(&self, id: AgentId, fields: &SubscriptionFields) -> Result<()> {
        self.agent_repo().save_subscription(id, fields).await
    }

    // Schedules and posts

    pub async fn find_schedule_for_week(
        &self,
        agent_id: AgentId,
        week_start: NaiveDate,
    ) -> Result<Option<Schedule>> {
        self.schedule_repo().find_by_week(agent_id, week_start).await
    }

    pub async fn get_schedule(&self, id: ScheduleId) -> Result<Option<Schedule>> {
        self.schedule_repo().get(id).await
    }

    pub async fn list_schedules(&self, agent_id: AgentId) -> Result<Vec<Schedule>> {
        self.schedule_repo().list_for_agent(agent_id).await
    }

    pub async fn create_schedule(
        &self,
        schedule: NewSchedule,
        posts: &[PostDraft],
        usage: NewUsage,
    ) -> Result<CreateOutcome> {
        self.schedule_repo()
            .create_with_posts(schedule, posts, usage)
            .await
    }

    pub async fn delete_schedule(&self, id: ScheduleId) -> Result<bool> {
        self.schedule_repo().delete(id).await
    }

    /// Post together with the id of the agent owning its schedule.
    pub async fn get_post(&self, id: PostId) -> Result<Option<(Post, AgentId)>> {
        self.schedule_repo().get_post(id).await
    }

    pub async fn attach_post_image(
        &self,
        post_id: PostId,
        agent_id: AgentId,
        image_url: &str,
        image_description: Option<&str>,
        usage: NewUsage,
    ) -> Result<Option<Post>> {
        self.schedule_repo()
            .attach_image(post_id, agent_id, image_url, image_description, usage)
            .await
    }

    // Usage

    pub async fn usage_summary(&self, agent_id: AgentId, recent: u64) -> Result<UsageSummary> {
        self.usage_repo().summary(agent_id, recent).await
    }

    // Billing events

    pub async fn record_billing_event(
        &self,
        record: EventRecord<'_>,
        transition: Option<&BillingTransition>,
    ) -> Result<WebhookOutcome> {
        self.billing_event_repo().record_and_apply(record, transition).await
    }
}

/// Encodes a focus list for a JSON text column.
pub(crate) fn encode_focus_list(types: &[InsuranceFocus]) -> String {
    serde_json::to_string(types).unwrap_or_else(|_| "[]".to_string())
}

pub(crate) fn decode_focus_list(raw: &str) -> Vec<InsuranceFocus> {
    serde_json::from_str(raw).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn pragma(store: &Store, name: &str) -> i64 {
        let backend = store.conn.get_database_backend();
        let row = store
            .conn
            .query_one(Statement::from_string(backend, format!("PRAGMA {name}")))
            .await
            .unwrap()
            .unwrap();
        row.try_get_by_index::<i64>(0).unwrap()
    }

    #[tokio::test]
    async fn connections_enforce_foreign_keys_and_wait_on_locks() {
        let store = Store::new("sqlite::memory:").await.unwrap();
        assert_eq!(pragma(&store, "foreign_keys").await, 1);
        assert_eq!(pragma(&store, "busy_timeout").await, 5000);
    }
}
