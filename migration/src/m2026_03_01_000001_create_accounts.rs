//! Migration to create the accounts table.
//!
//! Accounts are not time-series: every sync replaces the full list for a
//! tenant. The key is `(username, id)`; a shared account may appear under two
//! usernames.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).text().not_null())
                    .col(ColumnDef::new(Accounts::Username).text().not_null())
                    .col(ColumnDef::new(Accounts::Name).text().not_null())
                    .col(ColumnDef::new(Accounts::AccountType).text().not_null())
                    .col(ColumnDef::new(Accounts::Currency).text().not_null())
                    .col(ColumnDef::new(Accounts::Balance).double().not_null())
                    .primary_key(
                        Index::create()
                            .col(Accounts::Username)
                            .col(Accounts::Id),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Accounts {
    Table,
    Id,
    Username,
    Name,
    AccountType,
    Currency,
    Balance,
}
