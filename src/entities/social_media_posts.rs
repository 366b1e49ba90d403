use sea_orm::entity::prelude::*;

use crate::domain::InsuranceFocus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "social_media_posts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub schedule_id: i32,
    /// 1-based day within the week.
    pub day: i32,
    pub post_date: Date,
    pub post_text: String,
    pub image_url: Option<String>,
    pub image_description: String,
    /// JSON array of cleaned hashtags.
    pub hashtags: String,
    pub insurance_focus: Option<InsuranceFocus>,
    pub content_theme: String,
    pub engagement_hook: String,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::content_schedules::Entity",
        from = "Column::ScheduleId",
        to = "super::content_schedules::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    ContentSchedules,
}

impl Related<super::content_schedules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ContentSchedules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
