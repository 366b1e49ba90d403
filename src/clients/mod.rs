//! Outbound providers: the text/image generator and the billing provider.
//!
//! Both sit behind traits so the services can be driven by in-process fakes.

pub mod openai;
pub mod stripe;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::OpenAiClient;
pub use stripe::{
    BillingNotConfigured, BillingProvider, CheckoutParams, CheckoutSession, CreateCustomerParams,
    PlanInterval, StripeClient,
};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation provider is not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Provider returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),

    #[error("Provider call timed out after {0}s")]
    Timeout(u64),
}

/// One chat completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system: String,
    pub user: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub total_tokens: u32,
}

#[derive(Debug, Clone)]
pub struct ImageRequest {
    pub model: String,
    pub prompt: String,
    pub size: String,
    pub quality: String,
}

#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ImageBytes {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, GenerationError>;

    async fn generate_image(&self, request: ImageRequest)
    -> Result<GeneratedImage, GenerationError>;

    /// Fetches a previously generated image by its reference.
    async fn download_image(&self, url: &str) -> Result<ImageBytes, GenerationError>;
}
