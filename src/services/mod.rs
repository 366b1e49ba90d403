pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AccountView, AuthError, AuthService, Registration};
pub use auth_service_impl::SeaOrmAuthService;

pub mod content_service;
pub mod content_service_impl;
pub use content_service::{ContentError, ContentService, GenerateOutcome, GenerateRequest};
pub use content_service_impl::SeaOrmContentService;

pub mod image_service;
pub mod image_service_impl;
pub use image_service::{
    BatchOutcome, ImageDownload, ImageError, ImageFailure, ImageOutcome, ImageService,
};
pub use image_service_impl::SeaOrmImageService;

pub mod subscription_service;
pub mod subscription_service_impl;
pub use subscription_service::{
    CheckoutView, Pricing, SubscriptionError, SubscriptionService, SubscriptionView,
    WebhookReceipt,
};
pub use subscription_service_impl::SeaOrmSubscriptionService;

pub mod usage_service;
pub mod usage_service_impl;
pub use usage_service::{UsageError, UsageService};
pub use usage_service_impl::SeaOrmUsageService;
