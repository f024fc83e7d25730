//! # Data Models
//!
//! SeaORM entities for every synced entity kind, plus the read-only
//! trading position projection. Each synced entity declares its tenant and
//! watermark columns through [`crate::storage::SyncedEntity`].

pub mod account;
pub mod candle;
pub mod operation;
pub mod operation_loyalty_bonus;
pub mod purchased_security;
pub mod shopping_receipt;
pub mod shopping_receipt_item;
pub mod trading_operation;
pub mod trading_position;

pub use account::Entity as Account;
pub use candle::Entity as Candle;
pub use operation::Entity as Operation;
pub use operation_loyalty_bonus::Entity as OperationLoyaltyBonus;
pub use purchased_security::Entity as PurchasedSecurity;
pub use shopping_receipt::Entity as ShoppingReceipt;
pub use shopping_receipt_item::Entity as ShoppingReceiptItem;
pub use trading_operation::Entity as TradingOperation;
pub use trading_position::TradingPosition;
