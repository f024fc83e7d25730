//! Shopping receipt line item entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use crate::storage::{EntityDescriptor, SyncedEntity};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "shopping_receipt_items")]
pub struct Model {
    /// Owning provider username (tenant)
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub operation_id: String,

    /// Zero-based position of the line within its receipt
    #[sea_orm(primary_key, auto_increment = false)]
    pub position: i32,

    pub name: String,

    pub price: f64,

    pub quantity: f64,

    pub sum: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::shopping_receipt::Entity",
        from = "(Column::Username, Column::OperationId)",
        to = "(super::shopping_receipt::Column::Username, super::shopping_receipt::Column::OperationId)"
    )]
    Receipt,
}

impl Related<super::shopping_receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipt.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl SyncedEntity for Entity {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::new("shopping_receipt_items", vec![Column::Username], None)
    }
}
