use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // The provider-issued transaction id is the natural key; there is no
        // surrogate id so a second insert of the same transaction conflicts
        // on the primary key itself.
        manager
            .create_table(
                Table::create()
                    .table(Purchases::Table)
                    .if_not_exists()
                    .col(string(Purchases::TransactionId).primary_key().not_null())
                    .col(uuid(Purchases::UserId).not_null())
                    .col(string(Purchases::ProductId).not_null())
                    .col(timestamp_with_time_zone(Purchases::PurchaseDate).not_null())
                    .col(big_integer_null(Purchases::PriceCents))
                    .col(string_null(Purchases::Currency))
                    .col(string(Purchases::Status).not_null())
                    .col(timestamp_with_time_zone_null(Purchases::ProcessedAt))
                    .col(boolean(Purchases::Restored).default(false).not_null())
                    .col(string(Purchases::CreditStatus).not_null())
                    .col(timestamp_with_time_zone(Purchases::CreatedAt).not_null())
                    .col(timestamp_with_time_zone(Purchases::UpdatedAt).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchases_user_id")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchases_user_purchase_date")
                    .table(Purchases::Table)
                    .col(Purchases::UserId)
                    .col(Purchases::PurchaseDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Purchases::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Purchases {
    Table,
    TransactionId,
    UserId,
    ProductId,
    PurchaseDate,
    PriceCents,
    Currency,
    Status,
    ProcessedAt,
    Restored,
    CreditStatus,
    CreatedAt,
    UpdatedAt,
}
