//! Operation loyalty bonus entity model
//!
//! Bonuses are nested under their operation and carry no timestamp of their
//! own; they are replaced together with the operation.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use crate::storage::{EntityDescriptor, SyncedEntity};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "operation_loyalty_bonuses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,

    #[sea_orm(primary_key, auto_increment = false)]
    pub operation_id: String,

    /// Zero-based position of the bonus within its operation
    #[sea_orm(primary_key, auto_increment = false)]
    pub position: i32,

    pub description: String,

    pub loyalty_type: String,

    pub amount: f64,

    pub program_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl SyncedEntity for Entity {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::new("operation_loyalty_bonuses", vec![Column::Username], None)
    }
}
