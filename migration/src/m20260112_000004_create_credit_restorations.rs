use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Append-only audit log of crediting attempts
        manager
            .create_table(
                Table::create()
                    .table(CreditRestorations::Table)
                    .if_not_exists()
                    .col(pk_uuid(CreditRestorations::Id))
                    .col(uuid(CreditRestorations::UserId).not_null())
                    .col(string(CreditRestorations::ProductId).not_null())
                    .col(string(CreditRestorations::TransactionId).not_null())
                    .col(integer(CreditRestorations::ExpectedCredits).not_null())
                    .col(
                        integer(CreditRestorations::ActualCreditsAdded)
                            .default(0)
                            .not_null(),
                    )
                    .col(string(CreditRestorations::Reason).not_null())
                    .col(string(CreditRestorations::Status).not_null())
                    .col(timestamp_with_time_zone(CreditRestorations::CreatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_credit_restorations_user_id")
                    .table(CreditRestorations::Table)
                    .col(CreditRestorations::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_credit_restorations_transaction_id")
                    .table(CreditRestorations::Table)
                    .col(CreditRestorations::TransactionId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CreditRestorations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CreditRestorations {
    Table,
    Id,
    UserId,
    ProductId,
    TransactionId,
    ExpectedCredits,
    ActualCreditsAdded,
    Reason,
    Status,
    CreatedAt,
}
