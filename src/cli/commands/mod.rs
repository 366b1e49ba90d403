mod agent;
mod usage;

pub use agent::cmd_agent;
pub use usage::cmd_usage;
