//! Database migrations for the sync pipeline.
//!
//! One table per synced entity kind plus the read-only `trading_positions` view.

pub use sea_orm_migration::prelude::*;

mod m2026_03_01_000001_create_accounts;
mod m2026_03_01_000002_create_operations;
mod m2026_03_01_000003_create_shopping_receipts;
mod m2026_03_01_000004_create_trading_operations;
mod m2026_03_01_000005_create_purchased_securities;
mod m2026_03_01_000006_create_candles;
mod m2026_03_01_000007_create_trading_positions_view;
mod m2026_03_01_000008_create_operation_loyalty_bonuses;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_03_01_000001_create_accounts::Migration),
            Box::new(m2026_03_01_000002_create_operations::Migration),
            Box::new(m2026_03_01_000003_create_shopping_receipts::Migration),
            Box::new(m2026_03_01_000004_create_trading_operations::Migration),
            Box::new(m2026_03_01_000005_create_purchased_securities::Migration),
            Box::new(m2026_03_01_000006_create_candles::Migration),
            Box::new(m2026_03_01_000007_create_trading_positions_view::Migration),
            Box::new(m2026_03_01_000008_create_operation_loyalty_bonuses::Migration),
        ]
    }
}
