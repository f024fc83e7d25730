//! Migration to create the operations table.
//!
//! Operations are time-series rows watermarked by `debiting_time` per username.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Operations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Operations::Id).text().not_null())
                    .col(ColumnDef::new(Operations::Username).text().not_null())
                    .col(ColumnDef::new(Operations::AccountId).text().not_null())
                    .col(
                        ColumnDef::new(Operations::DebitingTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Operations::Description).text().not_null())
                    .col(ColumnDef::new(Operations::Category).text().null())
                    .col(ColumnDef::new(Operations::Amount).double().not_null())
                    .col(ColumnDef::new(Operations::Currency).text().not_null())
                    .col(ColumnDef::new(Operations::Status).text().not_null())
                    .col(
                        ColumnDef::new(Operations::HasShoppingReceipt)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .primary_key(
                        Index::create()
                            .col(Operations::Username)
                            .col(Operations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_operations_username_debiting_time")
                    .table(Operations::Table)
                    .col(Operations::Username)
                    .col(Operations::DebitingTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Operations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Operations {
    Table,
    Id,
    Username,
    AccountId,
    DebitingTime,
    Description,
    Category,
    Amount,
    Currency,
    Status,
    HasShoppingReceipt,
}
