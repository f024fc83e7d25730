//! Migration to create the trading_operations table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TradingOperations::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(TradingOperations::Id).text().not_null())
                    .col(ColumnDef::new(TradingOperations::Username).text().not_null())
                    .col(
                        ColumnDef::new(TradingOperations::Date)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(TradingOperations::OperationType)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TradingOperations::Ticker).text().not_null())
                    .col(
                        ColumnDef::new(TradingOperations::Quantity)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(TradingOperations::Price).double().not_null())
                    .col(ColumnDef::new(TradingOperations::Payment).double().not_null())
                    .col(ColumnDef::new(TradingOperations::Currency).text().not_null())
                    .primary_key(
                        Index::create()
                            .col(TradingOperations::Username)
                            .col(TradingOperations::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trading_operations_username_date")
                    .table(TradingOperations::Table)
                    .col(TradingOperations::Username)
                    .col(TradingOperations::Date)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TradingOperations::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum TradingOperations {
    Table,
    Id,
    Username,
    Date,
    OperationType,
    Ticker,
    Quantity,
    Price,
    Payment,
    Currency,
}
