//! Trading position projection
//!
//! Rows of the read-only `trading_positions` view. Used for reporting only;
//! the sync path never reads it.

use chrono::{DateTime, Utc};
use sea_orm::FromQueryResult;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Serialize, FromQueryResult)]
pub struct TradingPosition {
    pub username: String,
    pub ticker: String,
    pub buy_time: Option<DateTime<Utc>>,
    /// Null while the position is still open
    pub sell_time: Option<DateTime<Utc>>,
    pub quantity: i64,
}

impl TradingPosition {
    pub fn is_open(&self) -> bool {
        self.sell_time.is_none()
    }
}
