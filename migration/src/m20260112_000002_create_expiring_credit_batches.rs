use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ExpiringCreditBatches::Table)
                    .if_not_exists()
                    .col(pk_uuid(ExpiringCreditBatches::Id))
                    .col(uuid(ExpiringCreditBatches::UserId).not_null())
                    .col(integer(ExpiringCreditBatches::Amount).not_null())
                    .col(timestamp_with_time_zone(ExpiringCreditBatches::ExpiresAt).not_null())
                    .col(timestamp_with_time_zone(ExpiringCreditBatches::CreatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        // Spend order index: batches are consumed soonest-expiring first
        manager
            .create_index(
                Index::create()
                    .name("idx_expiring_credit_batches_user_expires_at")
                    .table(ExpiringCreditBatches::Table)
                    .col(ExpiringCreditBatches::UserId)
                    .col(ExpiringCreditBatches::ExpiresAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ExpiringCreditBatches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ExpiringCreditBatches {
    Table,
    Id,
    UserId,
    Amount,
    ExpiresAt,
    CreatedAt,
}
