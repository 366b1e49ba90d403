//! `SeaORM` implementation of the `ContentService` trait.

use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tracing::{debug, info, warn};

use crate::clients::{Completion, CompletionRequest, ContentGenerator, GenerationError};
use crate::config::GenerationConfig;
use crate::content::repair::ResponseSource;
use crate::content::{ContentRequest, build_content_prompt, repair_response};
use crate::db::{CreateOutcome, NewSchedule, Store};
use crate::domain::week::{Week, WeekError, resolve_week};
use crate::domain::{AgentId, ScheduleId, Tone, parse_focus_list};
use crate::models::Schedule;
use crate::models::usage::NewUsage;
use crate::services::content_service::{
    ContentError, ContentService, GenerateOutcome, GenerateRequest,
};

pub const GENERATE_CONTENT_ENDPOINT: &str = "generate_content";
const MAX_INSTRUCTIONS_LENGTH: usize = 1000;

pub struct SeaOrmContentService {
    store: Store,
    generator: Arc<dyn ContentGenerator>,
    config: Arc<GenerationConfig>,
}

impl SeaOrmContentService {
    #[must_use]
    pub fn new(
        store: Store,
        generator: Arc<dyn ContentGenerator>,
        config: Arc<GenerationConfig>,
    ) -> Self {
        Self {
            store,
            generator,
            config,
        }
    }

    /// Turns the raw request into a validated one. Falls back to the agent's
    /// saved preferences for an omitted tone or focus list.
    async fn validate(
        &self,
        agent_id: AgentId,
        request: GenerateRequest,
    ) -> Result<ContentRequest, ContentError> {
        let agent = self
            .store
            .get_agent(agent_id)
            .await?
            .ok_or(ContentError::AgentNotFound)?;

        let insurance_types = if request.insurance_types.is_empty() {
            agent.insurance_types.clone()
        } else {
            parse_focus_list(&request.insurance_types)
                .map_err(|e| ContentError::Validation(e.to_string()))?
        };
        if insurance_types.is_empty() {
            return Err(ContentError::Validation(
                "At least one insurance type is required".to_string(),
            ));
        }

        let tone = match request.tone.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                Tone::from_str(raw).map_err(|e| ContentError::Validation(e.to_string()))?
            }
            _ => agent.default_tone,
        };

        let additional_instructions = request
            .additional_instructions
            .unwrap_or_default()
            .trim()
            .to_string();
        if additional_instructions.chars().count() > MAX_INSTRUCTIONS_LENGTH {
            return Err(ContentError::Validation(format!(
                "Additional instructions must be {MAX_INSTRUCTIONS_LENGTH} characters or less"
            )));
        }

        let week = resolve_week(request.week_start.as_deref(), Utc::now().date_naive())
            .map_err(|err| {
                ContentError::Validation(match err {
                    WeekError::InvalidDate(_) => {
                        "Invalid week_start, expected YYYY-MM-DD".to_string()
                    }
                    WeekError::OutOfRange(_) => format!("Invalid week_start: {err}"),
                })
            })?;

        Ok(ContentRequest {
            insurance_types,
            tone,
            additional_instructions,
            week,
        })
    }

    async fn owned_schedule(
        &self,
        agent_id: AgentId,
        id: ScheduleId,
    ) -> Result<Schedule, ContentError> {
        let schedule = self
            .store
            .get_schedule(id)
            .await?
            .ok_or(ContentError::ScheduleNotFound(id))?;

        if schedule.agent_id != agent_id {
            warn!(agent_id = %agent_id, schedule_id = %id, owner = %schedule.agent_id, "Forbidden schedule access");
            return Err(ContentError::ScheduleNotFound(id));
        }
        Ok(schedule)
    }

    async fn call_generator(
        &self,
        request: CompletionRequest,
    ) -> Result<Completion, GenerationError> {
        let timeout_secs = self.config.request_timeout_seconds;
        tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.generator.complete(request),
        )
        .await
        .map_err(|_| GenerationError::Timeout(timeout_secs))?
    }
}

fn record_outcome(outcome: &'static str) {
    metrics::counter!("generation_requests_total", "outcome" => outcome).increment(1);
}

#[async_trait]
impl ContentService for SeaOrmContentService {
    async fn generate(
        &self,
        agent_id: AgentId,
        request: GenerateRequest,
    ) -> Result<GenerateOutcome, ContentError> {
        let request = self.validate(agent_id, request).await?;
        let week = request.week;

        if let Some(schedule) = self.store.find_schedule_for_week(agent_id, week.start).await? {
            debug!(agent_id = %agent_id, week_start = %week.start, "Schedule already exists");
            record_outcome("existing");
            return Ok(GenerateOutcome {
                schedule,
                created: false,
            });
        }

        let prompt = build_content_prompt(&request);
        let started = Instant::now();
        let completion = match self
            .call_generator(CompletionRequest {
                model: self.config.text_model.clone(),
                system: prompt.system.to_string(),
                user: prompt.user,
                max_tokens: self.config.max_output_tokens,
                temperature: self.config.temperature,
            })
            .await
        {
            Ok(completion) => completion,
            Err(err) => {
                warn!(agent_id = %agent_id, week_start = %week.start, error = %err, "Content generation failed");
                record_outcome("upstream_error");
                return Err(ContentError::Upstream(err));
            }
        };

        let repaired = repair_response(&completion.text, &week, &request.insurance_types);
        if repaired.source != ResponseSource::Strict {
            warn!(
                agent_id = %agent_id,
                source = repaired.source.as_str(),
                "Generator output needed repair"
            );
        }

        metrics::counter!("generation_tokens_total").increment(u64::from(completion.total_tokens));
        let usage = NewUsage {
            endpoint: GENERATE_CONTENT_ENDPOINT,
            tokens_used: i32::try_from(completion.total_tokens).unwrap_or(i32::MAX),
            cost: f64::from(completion.total_tokens) * self.config.cost_per_token,
        };

        let outcome = self
            .store
            .create_schedule(
                NewSchedule {
                    agent_id,
                    week,
                    tone: request.tone,
                    insurance_types: request.insurance_types,
                    additional_instructions: request.additional_instructions,
                },
                &repaired.posts,
                usage,
            )
            .await?;

        match outcome {
            CreateOutcome::Created(schedule) => {
                info!(
                    agent_id = %agent_id,
                    schedule_id = %schedule.id,
                    week_start = %week.start,
                    tokens = completion.total_tokens,
                    elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
                    "Generated weekly schedule"
                );
                record_outcome("created");
                Ok(GenerateOutcome {
                    schedule,
                    created: true,
                })
            }
            CreateOutcome::AlreadyExists(schedule) => {
                info!(agent_id = %agent_id, week_start = %week.start, "Concurrent generation lost the race; returning stored schedule");
                record_outcome("existing");
                Ok(GenerateOutcome {
                    schedule,
                    created: false,
                })
            }
        }
    }

    async fn list(&self, agent_id: AgentId) -> Result<Vec<Schedule>, ContentError> {
        Ok(self.store.list_schedules(agent_id).await?)
    }

    async fn get(&self, agent_id: AgentId, id: ScheduleId) -> Result<Schedule, ContentError> {
        self.owned_schedule(agent_id, id).await
    }

    async fn delete(&self, agent_id: AgentId, id: ScheduleId) -> Result<(), ContentError> {
        self.owned_schedule(agent_id, id).await?;
        if !self.store.delete_schedule(id).await? {
            return Err(ContentError::ScheduleNotFound(id));
        }
        info!(agent_id = %agent_id, schedule_id = %id, "Deleted schedule");
        Ok(())
    }

    async fn current_week(
        &self,
        agent_id: AgentId,
        today: NaiveDate,
    ) -> Result<Schedule, ContentError> {
        let week = Week::containing(today).ok_or_else(|| {
            ContentError::Validation(format!("Date {today} is outside the supported calendar range"))
        })?;
        self.store
            .find_schedule_for_week(agent_id, week.start)
            .await?
            .ok_or(ContentError::WeekNotGenerated {
                week_start: week.start,
                week_end: week.end,
            })
    }
}
