//! Migration to create the trading_positions view.
//!
//! A position is the net holding of one ticker for one username. `sell_time`
//! stays null while the position is open and becomes the last sell once the
//! net quantity drops to zero.

use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::Statement;

#[derive(DeriveMigrationName)]
pub struct Migration;

const CREATE_VIEW: &str = "CREATE VIEW trading_positions AS \
    SELECT username, ticker, \
        MIN(CASE WHEN operation_type = 'Buy' THEN date END) AS buy_time, \
        CASE WHEN SUM(CASE WHEN operation_type = 'Buy' THEN quantity ELSE -quantity END) = 0 \
            THEN MAX(CASE WHEN operation_type = 'Sell' THEN date END) END AS sell_time, \
        CAST(SUM(CASE WHEN operation_type = 'Buy' THEN quantity ELSE -quantity END) AS BIGINT) AS quantity \
    FROM trading_operations \
    GROUP BY username, ticker";

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                CREATE_VIEW.to_string(),
            ))
            .await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute(Statement::from_string(
                manager.get_database_backend(),
                "DROP VIEW IF EXISTS trading_positions".to_string(),
            ))
            .await?;
        Ok(())
    }
}
