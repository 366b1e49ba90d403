//! Domain service for weekly content schedules.
//!
//! Generation runs one request end to end: validate, resolve the week,
//! short-circuit on an existing schedule, call the generator, repair its
//! output and persist everything in one transaction.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clients::GenerationError;
use crate::domain::{AgentId, ScheduleId};
use crate::models::Schedule;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Schedule {0} not found")]
    ScheduleNotFound(ScheduleId),

    #[error("No schedule for the week of {week_start} to {week_end}")]
    WeekNotGenerated {
        week_start: NaiveDate,
        week_end: NaiveDate,
    },

    #[error("Agent not found")]
    AgentNotFound,

    #[error("Content generation failed: {0}")]
    Upstream(#[from] GenerationError),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for ContentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Raw generation input as the caller supplied it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub insurance_types: Vec<String>,
    pub tone: Option<String>,
    pub additional_instructions: Option<String>,
    /// Any date inside the wanted week, `YYYY-MM-DD`.
    pub week_start: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateOutcome {
    pub schedule: Schedule,
    /// False when the week already had a schedule.
    pub created: bool,
}

#[async_trait::async_trait]
pub trait ContentService: Send + Sync {
    /// Generates the schedule for one week, or returns the one already stored.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Validation`] before any provider call when the
    /// request is malformed, and [`ContentError::Upstream`] when the provider
    /// fails; nothing is written in either case.
    async fn generate(
        &self,
        agent_id: AgentId,
        request: GenerateRequest,
    ) -> Result<GenerateOutcome, ContentError>;

    async fn list(&self, agent_id: AgentId) -> Result<Vec<Schedule>, ContentError>;

    async fn get(&self, agent_id: AgentId, id: ScheduleId) -> Result<Schedule, ContentError>;

    async fn delete(&self, agent_id: AgentId, id: ScheduleId) -> Result<(), ContentError>;

    /// Schedule for the week containing `today`.
    async fn current_week(
        &self,
        agent_id: AgentId,
        today: NaiveDate,
    ) -> Result<Schedule, ContentError>;
}
