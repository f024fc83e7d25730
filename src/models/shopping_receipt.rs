//! Shopping receipt entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use crate::storage::{EntityDescriptor, SyncedEntity};

/// Fiscal receipt attached to a single operation
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "shopping_receipts")]
pub struct Model {
    /// Owning provider username (tenant)
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,

    /// Operation this receipt belongs to (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub operation_id: String,

    pub receipt_time: DateTimeUtc,

    pub retail_place: Option<String>,

    pub total_sum: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::shopping_receipt_item::Entity")]
    Items,
}

impl Related<super::shopping_receipt_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl SyncedEntity for Entity {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::new(
            "shopping_receipts",
            vec![Column::Username],
            Some(Column::ReceiptTime),
        )
    }
}
