//! # Executors
//!
//! One executor per synced entity kind. Each resolves its watermark, fetches
//! provider records newer than it, maps them into storage entities for the
//! run's tenant and reconciles them in one transaction.
//!
//! The set of executors is closed: [`ExecutorKind`] names every kind and is
//! what configuration selects from.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::credentials::TenantKey;
use crate::error::{StorageError, SyncError};
use crate::provider::{ProviderError, Session};
use crate::storage::{ReconcileOutcome, Storage, SyncedEntity, Watermark};
use crate::telemetry::current_run_id;

pub mod accounts;
pub mod candles;
pub mod operations;
pub mod purchased_securities;
pub mod trading_operations;

pub use accounts::AccountsExecutor;
pub use candles::CandlesExecutor;
pub use operations::OperationsExecutor;
pub use purchased_securities::PurchasedSecuritiesExecutor;
pub use trading_operations::TradingOperationsExecutor;

/// Everything an executor needs for one run.
pub struct ExecutorContext<'a> {
    pub session: &'a dyn Session,
    pub storage: &'a Storage,
    pub tenant: &'a TenantKey,
    pub cancel: &'a CancellationToken,
}

/// Outcome of one executor run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub kind: &'static str,
    /// Records returned by the provider
    pub fetched: usize,
    pub outcome: ReconcileOutcome,
    /// Line for the run report
    pub summary: String,
}

#[async_trait]
pub trait Executor: Send + Sync {
    fn kind(&self) -> &'static str;

    /// Check the entity descriptors this executor relies on.
    fn validate(&self) -> Result<(), StorageError>;

    /// Lower bound for the next fetch.
    async fn watermark(&self, storage: &Storage, tenant: &TenantKey)
    -> Result<Watermark, StorageError>;

    /// Fetch records newer than `since` and persist them.
    async fn run(&self, ctx: &ExecutorContext<'_>, since: Watermark)
    -> Result<BatchResult, SyncError>;
}

/// Every executor the pipeline knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorKind {
    Accounts,
    Operations,
    TradingOperations,
    PurchasedSecurities,
    Candles,
}

impl ExecutorKind {
    pub const ALL: [ExecutorKind; 5] = [
        ExecutorKind::Accounts,
        ExecutorKind::Operations,
        ExecutorKind::TradingOperations,
        ExecutorKind::PurchasedSecurities,
        ExecutorKind::Candles,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorKind::Accounts => "accounts",
            ExecutorKind::Operations => "operations",
            ExecutorKind::TradingOperations => "trading_operations",
            ExecutorKind::PurchasedSecurities => "purchased_securities",
            ExecutorKind::Candles => "candles",
        }
    }

    pub fn build(&self) -> Arc<dyn Executor> {
        match self {
            ExecutorKind::Accounts => Arc::new(AccountsExecutor),
            ExecutorKind::Operations => Arc::new(OperationsExecutor),
            ExecutorKind::TradingOperations => Arc::new(TradingOperationsExecutor),
            ExecutorKind::PurchasedSecurities => Arc::new(PurchasedSecuritiesExecutor),
            ExecutorKind::Candles => Arc::new(CandlesExecutor),
        }
    }
}

impl fmt::Display for ExecutorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ExecutorKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| format!("unknown executor '{}'", s.trim()))
    }
}

/// Build executors in the given order.
pub fn build_all(kinds: &[ExecutorKind]) -> Vec<Arc<dyn Executor>> {
    kinds.iter().map(ExecutorKind::build).collect()
}

/// Run a provider call unless the run is cancelled first.
pub(crate) async fn fetch<T, F>(
    ctx: &ExecutorContext<'_>,
    kind: &'static str,
    call: F,
) -> Result<T, SyncError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    debug!(kind, run_id = ?current_run_id(), "Fetching from provider");
    tokio::select! {
        biased;
        _ = ctx.cancel.cancelled() => Err(SyncError::Cancelled),
        result = call => result.map_err(|source| SyncError::FetchFailed { kind, source }),
    }
}

/// Descriptor check for time-series kinds: valid and carrying a watermark column.
pub(crate) fn validate_time_series<E: SyncedEntity>() -> Result<(), StorageError> {
    let descriptor = E::descriptor();
    descriptor.validate()?;
    descriptor.time_column().map(|_| ())
}

pub(crate) fn persist_error(kind: &'static str) -> impl Fn(StorageError) -> SyncError {
    move |error| SyncError::from_storage(kind, error)
}
