use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use tracing::debug;

use super::is_unique_violation;
use super::usage::insert_usage;
use crate::content::PostDraft;
use crate::db::{decode_focus_list, encode_focus_list};
use crate::domain::week::Week;
use crate::domain::{AgentId, InsuranceFocus, PostId, ScheduleId, Tone};
use crate::entities::{content_schedules, social_media_posts};
use crate::models::usage::NewUsage;
use crate::models::{Post, Schedule};

impl From<social_media_posts::Model> for Post {
    fn from(model: social_media_posts::Model) -> Self {
        Self {
            id: PostId::new(model.id),
            schedule_id: ScheduleId::new(model.schedule_id),
            day: model.day,
            post_date: model.post_date,
            post_text: model.post_text,
            image_url: model.image_url,
            image_description: model.image_description,
            hashtags: serde_json::from_str(&model.hashtags).unwrap_or_default(),
            insurance_focus: model.insurance_focus,
            content_theme: model.content_theme,
            engagement_hook: model.engagement_hook,
        }
    }
}

fn to_schedule(model: content_schedules::Model, mut posts: Vec<social_media_posts::Model>) -> Schedule {
    posts.sort_by_key(|post| post.day);
    Schedule {
        id: ScheduleId::new(model.id),
        agent_id: AgentId::new(model.agent_id),
        week_start: model.week_start,
        week_end: model.week_end,
        tone: model.tone,
        insurance_types: decode_focus_list(&model.insurance_types),
        additional_instructions: model.additional_instructions,
        created_at: model.created_at,
        posts: posts.into_iter().map(Post::from).collect(),
    }
}

#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub agent_id: AgentId,
    pub week: Week,
    pub tone: Tone,
    pub insurance_types: Vec<InsuranceFocus>,
    pub additional_instructions: String,
}

#[derive(Debug)]
pub enum CreateOutcome {
    Created(Schedule),
    /// Another writer persisted this week first.
    AlreadyExists(Schedule),
}

pub struct ScheduleRepository {
    conn: DatabaseConnection,
}

impl ScheduleRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn find_by_week(
        &self,
        agent_id: AgentId,
        week_start: NaiveDate,
    ) -> Result<Option<Schedule>> {
        let schedule = content_schedules::Entity::find()
            .filter(content_schedules::Column::AgentId.eq(agent_id.value()))
            .filter(content_schedules::Column::WeekStart.eq(week_start))
            .one(&self.conn)
            .await
            .context("Failed to query schedule by week")?;

        match schedule {
            Some(model) => Ok(Some(self.with_posts(model).await?)),
            None => Ok(None),
        }
    }

    pub async fn get(&self, id: ScheduleId) -> Result<Option<Schedule>> {
        let schedule = content_schedules::Entity::find_by_id(id.value())
            .one(&self.conn)
            .await
            .context("Failed to query schedule by ID")?;

        match schedule {
            Some(model) => Ok(Some(self.with_posts(model).await?)),
            None => Ok(None),
        }
    }

    /// Newest week first.
    pub async fn list_for_agent(&self, agent_id: AgentId) -> Result<Vec<Schedule>> {
        let rows = content_schedules::Entity::find()
            .filter(content_schedules::Column::AgentId.eq(agent_id.value()))
            .order_by_desc(content_schedules::Column::WeekStart)
            .find_with_related(social_media_posts::Entity)
            .all(&self.conn)
            .await
            .context("Failed to list schedules")?;

        Ok(rows
            .into_iter()
            .map(|(schedule, posts)| to_schedule(schedule, posts))
            .collect())
    }

    async fn with_posts(&self, model: content_schedules::Model) -> Result<Schedule> {
        let posts = model
            .find_related(social_media_posts::Entity)
            .order_by_asc(social_media_posts::Column::Day)
            .all(&self.conn)
            .await
            .context("Failed to load schedule posts")?;

        Ok(to_schedule(model, posts))
    }

    /// Writes the schedule, its posts and the usage entry as one unit.
    ///
    /// The schedule insert runs first so a concurrent writer for the same
    /// week trips the unique index before anything else is written.
    pub async fn create_with_posts(
        &self,
        schedule: NewSchedule,
        drafts: &[PostDraft],
        usage: NewUsage,
    ) -> Result<CreateOutcome> {
        let now = Utc::now();
        let agent_id = schedule.agent_id;
        let week_start = schedule.week.start;

        let txn = self.conn.begin().await?;

        let inserted = content_schedules::ActiveModel {
            agent_id: Set(agent_id.value()),
            week_start: Set(schedule.week.start),
            week_end: Set(schedule.week.end),
            tone: Set(schedule.tone),
            insurance_types: Set(encode_focus_list(&schedule.insurance_types)),
            additional_instructions: Set(schedule.additional_instructions),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let schedule_model = match inserted {
            Ok(model) => model,
            Err(err) if is_unique_violation(&err) => {
                txn.rollback().await?;
                debug!(agent_id = %agent_id, %week_start, "Schedule already persisted by another request");
                let existing = self
                    .find_by_week(agent_id, week_start)
                    .await?
                    .ok_or_else(|| anyhow::anyhow!("Conflicting schedule vanished"))?;
                return Ok(CreateOutcome::AlreadyExists(existing));
            }
            Err(err) => return Err(err).context("Failed to insert schedule"),
        };

        let mut posts = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let post = social_media_posts::ActiveModel {
                schedule_id: Set(schedule_model.id),
                day: Set(i32::try_from(draft.day).unwrap_or(i32::MAX)),
                post_date: Set(draft.post_date),
                post_text: Set(draft.post_text.clone()),
                image_url: Set(None),
                image_description: Set(draft.image_description.clone()),
                hashtags: Set(serde_json::to_string(&draft.hashtags)?),
                insurance_focus: Set(draft.insurance_focus),
                content_theme: Set(draft.content_theme.clone()),
                engagement_hook: Set(draft.engagement_hook.clone()),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .context("Failed to insert post")?;
            posts.push(post);
        }

        insert_usage(&txn, agent_id, &usage, now).await?;

        txn.commit().await.context("Failed to commit schedule")?;

        Ok(CreateOutcome::Created(to_schedule(schedule_model, posts)))
    }

    /// Deletes the schedule and all of its posts atomically.
    pub async fn delete(&self, id: ScheduleId) -> Result<bool> {
        let txn = self.conn.begin().await?;

        social_media_posts::Entity::delete_many()
            .filter(social_media_posts::Column::ScheduleId.eq(id.value()))
            .exec(&txn)
            .await
            .context("Failed to delete posts")?;

        let result = content_schedules::Entity::delete_by_id(id.value())
            .exec(&txn)
            .await
            .context("Failed to delete schedule")?;

        txn.commit().await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn get_post(&self, id: PostId) -> Result<Option<(Post, AgentId)>> {
        let row = social_media_posts::Entity::find_by_id(id.value())
            .find_also_related(content_schedules::Entity)
            .one(&self.conn)
            .await
            .context("Failed to query post")?;

        Ok(row.and_then(|(post, schedule)| {
            schedule.map(|schedule| (Post::from(post), AgentId::new(schedule.agent_id)))
        }))
    }

    /// Stores a generated image on a post and books its cost together.
    pub async fn attach_image(
        &self,
        post_id: PostId,
        agent_id: AgentId,
        image_url: &str,
        image_description: Option<&str>,
        usage: NewUsage,
    ) -> Result<Option<Post>> {
        let now = Utc::now();
        let txn = self.conn.begin().await?;

        let Some(model) = social_media_posts::Entity::find_by_id(post_id.value())
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut active: social_media_posts::ActiveModel = model.into();
        active.image_url = Set(Some(image_url.to_string()));
        if let Some(description) = image_description {
            active.image_description = Set(description.to_string());
        }
        let updated = active
            .update(&txn)
            .await
            .context("Failed to store post image")?;

        insert_usage(&txn, agent_id, &usage, now).await?;

        txn.commit().await?;
        Ok(Some(Post::from(updated)))
    }
}
