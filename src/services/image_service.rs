//! Domain service for post images.

use serde::Serialize;
use thiserror::Error;

use crate::clients::GenerationError;
use crate::domain::{AgentId, PostId, ScheduleId};
use crate::models::Post;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Post {0} not found")]
    PostNotFound(PostId),

    #[error("Schedule {0} not found")]
    ScheduleNotFound(ScheduleId),

    #[error("Post {0} has no image yet")]
    NoImage(PostId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Image generation failed: {0}")]
    Upstream(#[from] GenerationError),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<anyhow::Error> for ImageError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageOutcome {
    pub post: Post,
    /// False when the post already had an image and nothing was generated.
    pub generated: bool,
    pub cost: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    pub post_id: PostId,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImageFailure {
    pub post_id: PostId,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchOutcome {
    pub generated: Vec<GeneratedImage>,
    pub failures: Vec<ImageFailure>,
    pub total_cost: f64,
}

#[derive(Debug, Clone)]
pub struct ImageDownload {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait::async_trait]
pub trait ImageService: Send + Sync {
    /// Generates the post's image unless it already has one.
    async fn generate(&self, agent_id: AgentId, post_id: PostId)
    -> Result<ImageOutcome, ImageError>;

    /// Always generates a new image; `description` replaces the stored one
    /// only when the new image is saved.
    async fn regenerate(
        &self,
        agent_id: AgentId,
        post_id: PostId,
        description: Option<String>,
    ) -> Result<ImageOutcome, ImageError>;

    /// Generates images for every post of a schedule that lacks one. A failed
    /// post is reported and the rest still run.
    async fn generate_all(
        &self,
        agent_id: AgentId,
        schedule_id: ScheduleId,
    ) -> Result<BatchOutcome, ImageError>;

    async fn download(&self, agent_id: AgentId, post_id: PostId)
    -> Result<ImageDownload, ImageError>;
}

/// File extension for an image content type.
#[must_use]
pub fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    }
}

#[must_use]
pub fn download_filename(post: &Post, content_type: &str) -> String {
    format!(
        "post_{}_{}.{}",
        post.id,
        post.post_date.format("%Y%m%d"),
        extension_for(content_type)
    )
}
