//! `SeaORM` implementation of the `ImageService` trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::clients::{ContentGenerator, GenerationError, ImageRequest};
use crate::config::GenerationConfig;
use crate::content::build_image_prompt;
use crate::db::Store;
use crate::domain::{AgentId, PostId, ScheduleId};
use crate::models::Post;
use crate::models::usage::NewUsage;
use crate::services::image_service::{
    BatchOutcome, GeneratedImage, ImageDownload, ImageError, ImageFailure, ImageOutcome,
    ImageService, download_filename,
};

pub const GENERATE_IMAGE_ENDPOINT: &str = "generate_image";
pub const REGENERATE_IMAGE_ENDPOINT: &str = "regenerate_image";
const MAX_DESCRIPTION_LENGTH: usize = 1000;

pub struct SeaOrmImageService {
    store: Store,
    generator: Arc<dyn ContentGenerator>,
    config: Arc<GenerationConfig>,
}

impl SeaOrmImageService {
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

    async fn owned_post(&self, agent_id: AgentId, post_id: PostId) -> Result<Post, ImageError> {
        let (post, owner) = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(ImageError::PostNotFound(post_id))?;

        if owner != agent_id {
            warn!(agent_id = %agent_id, post_id = %post_id, owner = %owner, "Forbidden post access");
            return Err(ImageError::PostNotFound(post_id));
        }
        Ok(post)
    }

    /// Calls the provider and stores the result. The post is left as it was
    /// when the provider fails.
    async fn render(
        &self,
        agent_id: AgentId,
        post: &Post,
        description: Option<&str>,
        endpoint: &'static str,
    ) -> Result<ImageOutcome, ImageError> {
        let image_description = description.unwrap_or(post.image_description.as_str());
        let prompt = build_image_prompt(&post.post_text, image_description, post.insurance_focus);

        let timeout_secs = self.config.request_timeout_seconds;
        let result = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.generator.generate_image(ImageRequest {
                model: self.config.image_model.clone(),
                prompt,
                size: self.config.image_size.clone(),
                quality: self.config.image_quality.clone(),
            }),
        )
        .await
        .map_err(|_| GenerationError::Timeout(timeout_secs))
        .and_then(|inner| inner);

        let image = match result {
            Ok(image) => image,
            Err(err) => {
                warn!(agent_id = %agent_id, post_id = %post.id, error = %err, "Image generation failed");
                metrics::counter!("image_generations_total", "outcome" => "upstream_error")
                    .increment(1);
                return Err(ImageError::Upstream(err));
            }
        };

        let cost = self.config.cost_per_image;
        let updated = self
            .store
            .attach_post_image(
                post.id,
                agent_id,
                &image.url,
                description,
                NewUsage {
                    endpoint,
                    tokens_used: 0,
                    cost,
                },
            )
            .await?
            .ok_or(ImageError::PostNotFound(post.id))?;

        metrics::counter!("image_generations_total", "outcome" => "created").increment(1);
        info!(agent_id = %agent_id, post_id = %post.id, endpoint, "Stored generated image");

        Ok(ImageOutcome {
            post: updated,
            generated: true,
            cost,
        })
    }
}

fn clean_description(description: Option<String>) -> Result<Option<String>, ImageError> {
    let Some(description) = description else {
        return Ok(None);
    };
    let description = description.trim().to_string();
    if description.is_empty() {
        return Ok(None);
    }
    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(ImageError::Validation(format!(
            "Image description must be {MAX_DESCRIPTION_LENGTH} characters or less"
        )));
    }
    Ok(Some(description))
}

#[async_trait]
impl ImageService for SeaOrmImageService {
    async fn generate(
        &self,
        agent_id: AgentId,
        post_id: PostId,
    ) -> Result<ImageOutcome, ImageError> {
        let post = self.owned_post(agent_id, post_id).await?;
        if post.has_image() {
            metrics::counter!("image_generations_total", "outcome" => "existing").increment(1);
            return Ok(ImageOutcome {
                post,
                generated: false,
                cost: 0.0,
            });
        }
        self.render(agent_id, &post, None, GENERATE_IMAGE_ENDPOINT)
            .await
    }

    async fn regenerate(
        &self,
        agent_id: AgentId,
        post_id: PostId,
        description: Option<String>,
    ) -> Result<ImageOutcome, ImageError> {
        let description = clean_description(description)?;
        let post = self.owned_post(agent_id, post_id).await?;
        self.render(
            agent_id,
            &post,
            description.as_deref(),
            REGENERATE_IMAGE_ENDPOINT,
        )
        .await
    }

    async fn generate_all(
        &self,
        agent_id: AgentId,
        schedule_id: ScheduleId,
    ) -> Result<BatchOutcome, ImageError> {
        let schedule = self
            .store
            .get_schedule(schedule_id)
            .await?
            .ok_or(ImageError::ScheduleNotFound(schedule_id))?;
        if schedule.agent_id != agent_id {
            warn!(agent_id = %agent_id, schedule_id = %schedule_id, "Forbidden schedule access");
            return Err(ImageError::ScheduleNotFound(schedule_id));
        }

        let mut outcome = BatchOutcome::default();
        for post in schedule.posts.iter().filter(|post| !post.has_image()) {
            match self
                .render(agent_id, post, None, GENERATE_IMAGE_ENDPOINT)
                .await
            {
                Ok(rendered) => {
                    outcome.total_cost += rendered.cost;
                    if let Some(image_url) = rendered.post.image_url {
                        outcome.generated.push(GeneratedImage {
                            post_id: post.id,
                            image_url,
                        });
                    }
                }
                Err(err) => outcome.failures.push(ImageFailure {
                    post_id: post.id,
                    error: err.to_string(),
                }),
            }
        }

        info!(
            agent_id = %agent_id,
            schedule_id = %schedule_id,
            generated = outcome.generated.len(),
            failed = outcome.failures.len(),
            "Batch image generation finished"
        );
        Ok(outcome)
    }

    async fn download(
        &self,
        agent_id: AgentId,
        post_id: PostId,
    ) -> Result<ImageDownload, ImageError> {
        let post = self.owned_post(agent_id, post_id).await?;
        let url = post
            .image_url
            .as_deref()
            .ok_or(ImageError::NoImage(post_id))?;

        let timeout_secs = self.config.request_timeout_seconds;
        let image = tokio::time::timeout(
            Duration::from_secs(timeout_secs),
            self.generator.download_image(url),
        )
        .await
        .map_err(|_| GenerationError::Timeout(timeout_secs))??;

        Ok(ImageDownload {
            filename: download_filename(&post, &image.content_type),
            content_type: image.content_type,
            bytes: image.bytes,
        })
    }
}
