//! Migration to create the shopping receipt tables.
//!
//! Receipts hang off operations (one receipt per operation) and own a list of
//! line items keyed by `(username, operation_id, position)`. Every key leads
//! with the username so equal provider ids under two tenants never collide.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ShoppingReceipts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ShoppingReceipts::OperationId).text().not_null())
                    .col(ColumnDef::new(ShoppingReceipts::Username).text().not_null())
                    .col(
                        ColumnDef::new(ShoppingReceipts::ReceiptTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShoppingReceipts::RetailPlace).text().null())
                    .col(ColumnDef::new(ShoppingReceipts::TotalSum).double().not_null())
                    .primary_key(
                        Index::create()
                            .col(ShoppingReceipts::Username)
                            .col(ShoppingReceipts::OperationId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ShoppingReceiptItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ShoppingReceiptItems::OperationId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ShoppingReceiptItems::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShoppingReceiptItems::Username).text().not_null())
                    .col(ColumnDef::new(ShoppingReceiptItems::Name).text().not_null())
                    .col(ColumnDef::new(ShoppingReceiptItems::Price).double().not_null())
                    .col(
                        ColumnDef::new(ShoppingReceiptItems::Quantity)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ShoppingReceiptItems::Sum).double().not_null())
                    .primary_key(
                        Index::create()
                            .col(ShoppingReceiptItems::Username)
                            .col(ShoppingReceiptItems::OperationId)
                            .col(ShoppingReceiptItems::Position),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ShoppingReceiptItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ShoppingReceipts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ShoppingReceipts {
    Table,
    OperationId,
    Username,
    ReceiptTime,
    RetailPlace,
    TotalSum,
}

#[derive(DeriveIden)]
enum ShoppingReceiptItems {
    Table,
    OperationId,
    Position,
    Username,
    Name,
    Price,
    Quantity,
    Sum,
}
