use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::domain::{AgentId, InsuranceFocus, PostId, ScheduleId, Tone};

#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub id: ScheduleId,
    pub agent_id: AgentId,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub tone: Tone,
    pub insurance_types: Vec<InsuranceFocus>,
    pub additional_instructions: String,
    pub created_at: DateTime<Utc>,
    /// Ordered by day.
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Post {
    pub id: PostId,
    pub schedule_id: ScheduleId,
    pub day: i32,
    pub post_date: NaiveDate,
    pub post_text: String,
    pub image_url: Option<String>,
    pub image_description: String,
    pub hashtags: Vec<String>,
    pub insurance_focus: Option<InsuranceFocus>,
    pub content_theme: String,
    pub engagement_hook: String,
}

impl Post {
    #[must_use]
    pub const fn has_image(&self) -> bool {
        self.image_url.is_some()
    }
}
