use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create credit_balances table for permanent (non-expiring) credits
        manager
            .create_table(
                Table::create()
                    .table(CreditBalances::Table)
                    .if_not_exists()
                    .col(pk_uuid(CreditBalances::Id))
                    .col(uuid(CreditBalances::UserId).not_null())
                    .col(
                        integer(CreditBalances::PermanentCredits)
                            .default(0)
                            .not_null(),
                    )
                    .col(timestamp_with_time_zone(CreditBalances::LastUpdated).not_null())
                    .col(timestamp_with_time_zone(CreditBalances::CreatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        // One balance row per user
        manager
            .create_index(
                Index::create()
                    .name("idx_credit_balances_user_id")
                    .table(CreditBalances::Table)
                    .col(CreditBalances::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditBalances::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CreditBalances {
    Table,
    Id,
    UserId,
    PermanentCredits,
    LastUpdated,
    CreatedAt,
}
