use sea_orm::entity::prelude::*;

use crate::domain::{SubscriptionStatus, Tone};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "agents")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Lowercased, trimmed login email.
    #[sea_orm(unique)]
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,

    pub subscription_status: SubscriptionStatus,
    pub trial_start: DateTimeUtc,
    pub trial_end: DateTimeUtc,
    pub subscription_start: Option<DateTimeUtc>,
    pub subscription_end: Option<DateTimeUtc>,
    pub cancel_at_period_end: bool,

    pub billing_customer_id: Option<String>,
    pub billing_subscription_id: Option<String>,

    pub default_tone: Tone,
    /// JSON array of preferred insurance focus categories.
    pub insurance_types: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::content_schedules::Entity")]
    ContentSchedules,
    #[sea_orm(has_many = "super::api_usage::Entity")]
    ApiUsage,
}

impl Related<super::content_schedules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContentSchedules.def()
    }
}

impl Related<super::api_usage::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiUsage.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
