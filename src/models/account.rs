//! Account entity model
//!
//! Accounts carry no timestamp; the whole list is replaced on every sync.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;

use crate::storage::{EntityDescriptor, SyncedEntity};

/// Provider-side account (card, deposit, brokerage) owned by a username
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    /// Owning provider username (tenant)
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,

    /// Provider account identifier (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    /// Provider account type (e.g. Credit, Current, Deposit)
    pub account_type: String,

    pub currency: String,

    pub balance: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl SyncedEntity for Entity {
    fn descriptor() -> EntityDescriptor<Self> {
        EntityDescriptor::new("accounts", vec![Column::Username], None)
    }
}
