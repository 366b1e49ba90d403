use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::entitlement::SubscriptionFields;
use crate::domain::{AgentId, InsuranceFocus, Tone};

/// An agent as seen by services. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct Agent {
    pub id: AgentId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(flatten)]
    pub subscription: SubscriptionFields,
    #[serde(skip_serializing)]
    pub billing_customer_id: Option<String>,
    #[serde(skip_serializing)]
    pub billing_subscription_id: Option<String>,
    pub default_tone: Tone,
    pub insurance_types: Vec<InsuranceFocus>,
    pub created_at: DateTime<Utc>,
}

impl Agent {
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}
