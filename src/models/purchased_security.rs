//! Purchased security entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use crate::storage::{EntityDescriptor, SyncedEntity};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "purchased_securities")]
pub struct Model {
    /// Owning provider username (tenant)
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub ticker: String,

    pub purchase_time: DateTimeUtc,

    pub quantity: i64,

    pub price: f64,

    pub currency: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl SyncedEntity for Entity {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::new(
            "purchased_securities",
            vec![Column::Username],
            Some(Column::PurchaseTime),
        )
    }
}
