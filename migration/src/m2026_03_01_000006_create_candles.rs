//! Migration to create the candles table.
//!
//! Candles are keyed by `(username, ticker, interval, time)` so that two
//! tenants holding the same security never overwrite each other.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Candles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Candles::Username).text().not_null())
                    .col(ColumnDef::new(Candles::Ticker).text().not_null())
                    .col(ColumnDef::new(Candles::Interval).text().not_null())
                    .col(
                        ColumnDef::new(Candles::Time)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Candles::Open).double().not_null())
                    .col(ColumnDef::new(Candles::Close).double().not_null())
                    .col(ColumnDef::new(Candles::High).double().not_null())
                    .col(ColumnDef::new(Candles::Low).double().not_null())
                    .col(ColumnDef::new(Candles::Volume).big_integer().not_null())
                    .primary_key(
                        Index::create()
                            .col(Candles::Username)
                            .col(Candles::Ticker)
                            .col(Candles::Interval)
                            .col(Candles::Time),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Candles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Candles {
    Table,
    Username,
    Ticker,
    Interval,
    Time,
    Open,
    Close,
    High,
    Low,
    Volume,
}
