use sea_orm::entity::prelude::*;

use crate::domain::Tone;

/// One generated week. `(agent_id, week_start)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "content_schedules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub agent_id: i32,
    /// Always a Monday.
    pub week_start: Date,
    pub week_end: Date,
    pub tone: Tone,
    /// JSON array of the requested insurance focus categories.
    pub insurance_types: String,
    pub additional_instructions: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::agents::Entity",
        from = "Column::AgentId",
        to = "super::agents::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Agents,
    #[sea_orm(has_many = "super::social_media_posts::Entity")]
    SocialMediaPosts,
}

impl Related<super::agents::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Agents.def()
    }
}

impl Related<super::social_media_posts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SocialMediaPosts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
