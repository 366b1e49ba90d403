pub mod agent;
pub mod schedule;
pub mod usage;

pub use agent::Agent;
pub use schedule::{Post, Schedule};
pub use usage::{UsageEntry, UsageSummary};
