//! Migration to create the operation_loyalty_bonuses table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OperationLoyaltyBonuses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OperationLoyaltyBonuses::Username)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OperationLoyaltyBonuses::OperationId)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OperationLoyaltyBonuses::Position)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OperationLoyaltyBonuses::Description)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OperationLoyaltyBonuses::LoyaltyType)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OperationLoyaltyBonuses::Amount)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(OperationLoyaltyBonuses::ProgramId).text().null())
                    .primary_key(
                        Index::create()
                            .col(OperationLoyaltyBonuses::Username)
                            .col(OperationLoyaltyBonuses::OperationId)
                            .col(OperationLoyaltyBonuses::Position),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OperationLoyaltyBonuses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OperationLoyaltyBonuses {
    Table,
    Username,
    OperationId,
    Position,
    Description,
    LoyaltyType,
    Amount,
    ProgramId,
}
