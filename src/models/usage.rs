use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct UsageEntry {
    pub endpoint: String,
    pub tokens_used: i32,
    pub cost: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageSummary {
    pub total_calls: u64,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub recent: Vec<UsageEntry>,
}

/// One ledger line waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUsage {
    pub endpoint: &'static str,
    pub tokens_used: i32,
    pub cost: f64,
}
