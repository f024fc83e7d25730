//! Trading operation entity model
//!
//! Brokerage buys and sells, watermarked by `date`. The `trading_positions`
//! view aggregates these rows per ticker.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use crate::storage::{EntityDescriptor, SyncedEntity};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "trading_operations")]
pub struct Model {
    /// Owning provider username (tenant)
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub date: DateTimeUtc,

    /// `Buy` or `Sell`
    pub operation_type: String,

    pub ticker: String,

    pub quantity: i64,

    pub price: f64,

    pub payment: f64,

    pub currency: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl SyncedEntity for Entity {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::new(
            "trading_operations",
            vec![Column::Username],
            Some(Column::Date),
        )
    }
}
