//! Provider record types
//!
//! Records as the provider reports them. Executors map these into storage
//! entities and attach the tenant key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub name: String,
    pub account_type: String,
    pub currency: String,
    #[serde(default)]
    pub balance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub id: String,
    pub account_id: String,
    pub debiting_time: DateTime<Utc>,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub amount: f64,
    pub currency: String,
    pub status: String,
    #[serde(default)]
    pub has_shopping_receipt: bool,
    #[serde(default)]
    pub loyalty_bonuses: Vec<LoyaltyBonusRecord>,
}

/// Cashback or points credited for one operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoyaltyBonusRecord {
    pub description: String,
    /// Program kind as reported by the provider (e.g. `cashback`, `points`)
    pub loyalty_type: String,
    pub amount: f64,
    #[serde(default)]
    pub program_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingReceiptRecord {
    pub operation_id: String,
    pub receipt_time: DateTime<Utc>,
    #[serde(default)]
    pub retail_place: Option<String>,
    pub total_sum: f64,
    #[serde(default)]
    pub items: Vec<ReceiptItemRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptItemRecord {
    pub name: String,
    pub price: f64,
    pub quantity: f64,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingOperationRecord {
    pub id: String,
    pub date: DateTime<Utc>,
    /// `Buy` or `Sell`
    pub operation_type: String,
    pub ticker: String,
    pub quantity: i64,
    pub price: f64,
    pub payment: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchasedSecurityRecord {
    pub id: String,
    pub ticker: String,
    pub purchase_time: DateTime<Utc>,
    pub quantity: i64,
    pub price: f64,
    pub currency: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleRecord {
    pub ticker: String,
    pub interval: String,
    pub time: DateTime<Utc>,
    pub open: f64,
    pub close: f64,
    pub high: f64,
    pub low: f64,
    #[serde(default)]
    pub volume: i64,
}
