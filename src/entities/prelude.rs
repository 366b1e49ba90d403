pub use super::agents::Entity as Agents;
pub use super::api_usage::Entity as ApiUsage;
pub use super::billing_events::Entity as BillingEvents;
pub use super::content_schedules::Entity as ContentSchedules;
pub use super::social_media_posts::Entity as SocialMediaPosts;
