//! Migration to create the purchased_securities table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchasedSecurities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PurchasedSecurities::Id).text().not_null())
                    .col(ColumnDef::new(PurchasedSecurities::Username).text().not_null())
                    .col(ColumnDef::new(PurchasedSecurities::Ticker).text().not_null())
                    .col(
                        ColumnDef::new(PurchasedSecurities::PurchaseTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchasedSecurities::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchasedSecurities::Price).double().not_null())
                    .col(ColumnDef::new(PurchasedSecurities::Currency).text().not_null())
                    .primary_key(
                        Index::create()
                            .col(PurchasedSecurities::Username)
                            .col(PurchasedSecurities::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_purchased_securities_username_purchase_time")
                    .table(PurchasedSecurities::Table)
                    .col(PurchasedSecurities::Username)
                    .col(PurchasedSecurities::PurchaseTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PurchasedSecurities::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PurchasedSecurities {
    Table,
    Id,
    Username,
    Ticker,
    PurchaseTime,
    Quantity,
    Price,
    Currency,
}
