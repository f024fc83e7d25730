//! Provider capability
//!
//! The sync core only needs two things from the financial data provider: a
//! login handshake that may demand a one-time code, and a typed fetch per
//! entity kind on the resulting session. The wire protocol lives behind these
//! traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::credentials::Secret;

pub mod memory;
pub mod types;

pub use types::{
    AccountRecord, CandleRecord, LoyaltyBonusRecord, OperationRecord, PurchasedSecurityRecord,
    ReceiptItemRecord, ShoppingReceiptRecord, TradingOperationRecord,
};

/// Provider-side errors for login and fetch calls
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Credentials, code or request refused by the provider
    #[error("provider rejected request: {0}")]
    Rejected(String),
    /// Network or upstream availability problem
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    /// Response could not be interpreted
    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Pending login handshake waiting for a one-time code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub handshake_id: String,
    pub username: String,
    /// Where the code was sent, if the provider says
    pub hint: Option<String>,
}

/// Result of the first login step.
pub enum LoginStep {
    Authorized(Box<dyn Session>),
    CodeRequired(Challenge),
}

impl std::fmt::Debug for LoginStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginStep::Authorized(session) => f
                .debug_tuple("Authorized")
                .field(&session.username())
                .finish(),
            LoginStep::CodeRequired(challenge) => {
                f.debug_tuple("CodeRequired").field(challenge).finish()
            }
        }
    }
}

/// Login handshake against the provider.
#[async_trait]
pub trait Provider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Start a handshake with username and password.
    async fn login(&self, username: &str, password: &Secret) -> Result<LoginStep, ProviderError>;

    /// Complete a handshake with the code the user supplied.
    async fn confirm(
        &self,
        challenge: &Challenge,
        code: &str,
    ) -> Result<Box<dyn Session>, ProviderError>;

    /// Release provider-side state of a handshake that will not be confirmed.
    async fn abort(&self, challenge: &Challenge);
}

/// Authorized client handle, valid for one run and bound to one username.
///
/// Time-series fetches return records strictly newer than `since`, or every
/// record when `since` is `None`.
#[async_trait]
pub trait Session: Send + Sync {
    fn username(&self) -> &str;

    async fn accounts(&self) -> Result<Vec<AccountRecord>, ProviderError>;

    async fn operations(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OperationRecord>, ProviderError>;

    async fn shopping_receipt(
        &self,
        operation_id: &str,
    ) -> Result<Option<ShoppingReceiptRecord>, ProviderError>;

    async fn trading_operations(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<TradingOperationRecord>, ProviderError>;

    async fn purchased_securities(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PurchasedSecurityRecord>, ProviderError>;

    async fn candles(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<CandleRecord>, ProviderError>;
}
