//! Operation entity model
//!
//! Card and account operations, watermarked by `debiting_time`.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use crate::storage::{EntityDescriptor, SyncedEntity};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "operations")]
pub struct Model {
    /// Owning provider username (tenant)
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,

    /// Provider operation identifier (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    /// Account the operation was booked against
    pub account_id: String,

    /// Time the operation was debited; drives incremental fetches
    pub debiting_time: DateTimeUtc,

    pub description: String,

    pub category: Option<String>,

    pub amount: f64,

    pub currency: String,

    /// Provider status (e.g. OK, FAILED)
    pub status: String,

    /// Whether the provider holds a shopping receipt for this operation
    pub has_shopping_receipt: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl SyncedEntity for Entity {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::new(
            "operations",
            vec![Column::Username],
            Some(Column::DebitingTime),
        )
    }
}
