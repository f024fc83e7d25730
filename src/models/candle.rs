//! Market candle entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use crate::storage::{EntityDescriptor, SyncedEntity};

/// OHLC candle for one ticker and interval, stored per username
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "candles")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub ticker: String,

    /// Candle interval as reported by the provider (e.g. `day`, `hour`)
    #[sea_orm(primary_key, auto_increment = false)]
    pub interval: String,

    /// Candle open time
    #[sea_orm(primary_key, auto_increment = false)]
    pub time: DateTimeUtc,

    pub open: f64,

    pub close: f64,

    pub high: f64,

    pub low: f64,

    pub volume: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl SyncedEntity for Entity {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::new("candles", vec![Column::Username], Some(Column::Time))
    }
}
