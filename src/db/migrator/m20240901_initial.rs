use crate::entities::prelude::*;
use crate::entities::{api_usage, content_schedules, social_media_posts};
use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Schema;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();
        let schema = Schema::new(backend);

        // Parents before children so the foreign keys resolve.
        manager
            .create_table(schema.create_table_from_entity(Agents).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(ContentSchedules)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(SocialMediaPosts)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_table(schema.create_table_from_entity(ApiUsage).if_not_exists().to_owned())
            .await?;
        manager
            .create_table(
                schema
                    .create_table_from_entity(BillingEvents)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        // One schedule per agent per week, enforced by the store itself.
        manager
            .create_index(
                Index::create()
                    .name("idx_content_schedules_agent_week")
                    .table(ContentSchedules)
                    .col(content_schedules::Column::AgentId)
                    .col(content_schedules::Column::WeekStart)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_social_media_posts_schedule")
                    .table(SocialMediaPosts)
                    .col(social_media_posts::Column::ScheduleId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_api_usage_agent_created")
                    .table(ApiUsage)
                    .col(api_usage::Column::AgentId)
                    .col(api_usage::Column::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BillingEvents).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ApiUsage).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SocialMediaPosts).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ContentSchedules).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Agents).if_exists().to_owned())
            .await
    }
}
