pub mod prelude;

pub mod agents;
pub mod api_usage;
pub mod billing_events;
pub mod content_schedules;
pub mod social_media_posts;
