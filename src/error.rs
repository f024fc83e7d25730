//! # Error Handling
//!
//! Error taxonomy for the sync pipeline. [`SyncError`] is what a run reports to
//! the requester; [`StorageError`] is what the storage engine returns and is
//! classified into either a persistence failure or a configuration error.

use thiserror::Error;

use crate::credentials::RequesterId;
use crate::provider::ProviderError;

/// Errors surfaced by a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No credential is configured for the requester. No provider call was made.
    #[error("unknown user {0}")]
    UnknownUser(RequesterId),
    /// The provider rejected the credentials or the one-time code.
    #[error("authorization failed: {0}")]
    AuthorizationFailed(String),
    /// The one-time-code exchange was cancelled, timed out or errored.
    #[error("authorization aborted: {0}")]
    AuthorizationAborted(String),
    #[error("{kind}: fetch failed: {source}")]
    FetchFailed {
        kind: &'static str,
        #[source]
        source: ProviderError,
    },
    #[error("{kind}: persist failed: {source}")]
    PersistFailed {
        kind: &'static str,
        #[source]
        source: StorageError,
    },
    #[error("{kind} has no watermark column")]
    NoWatermarkField { kind: &'static str },
    #[error("{kind} declares {expected} tenant column(s) but {actual} value(s) were supplied")]
    TenantMismatch {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid descriptor for {kind}: {reason}")]
    InvalidDescriptor { kind: &'static str, reason: String },
    #[error("run cancelled")]
    Cancelled,
}

impl SyncError {
    /// Classify a storage error raised while an executor persisted or resolved
    /// its watermark. Configuration-class errors keep their own variant.
    pub fn from_storage(kind: &'static str, error: StorageError) -> Self {
        match error {
            StorageError::NoWatermarkField { kind } => SyncError::NoWatermarkField { kind },
            StorageError::TenantMismatch {
                kind,
                expected,
                actual,
            } => SyncError::TenantMismatch {
                kind,
                expected,
                actual,
            },
            StorageError::InvalidDescriptor { kind, reason } => {
                SyncError::InvalidDescriptor { kind, reason }
            }
            other => SyncError::PersistFailed {
                kind,
                source: other,
            },
        }
    }

    /// Whether this is a setup problem rather than a runtime failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SyncError::NoWatermarkField { .. }
                | SyncError::TenantMismatch { .. }
                | SyncError::InvalidDescriptor { .. }
        )
    }

    /// Stable label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            SyncError::UnknownUser(_) => "unknown_user",
            SyncError::AuthorizationFailed(_) => "authorization_failed",
            SyncError::AuthorizationAborted(_) => "authorization_aborted",
            SyncError::FetchFailed { .. } => "fetch_failed",
            SyncError::PersistFailed { .. } => "persist_failed",
            SyncError::NoWatermarkField { .. } => "no_watermark_field",
            SyncError::TenantMismatch { .. } => "tenant_mismatch",
            SyncError::InvalidDescriptor { .. } => "invalid_descriptor",
            SyncError::Cancelled => "cancelled",
        }
    }
}

/// Errors raised by the storage engine.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("{kind} has no watermark column")]
    NoWatermarkField { kind: &'static str },
    #[error("{kind} declares {expected} tenant column(s) but {actual} value(s) were supplied")]
    TenantMismatch {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("invalid descriptor for {kind}: {reason}")]
    InvalidDescriptor { kind: &'static str, reason: String },
    #[error("{kind} row has no value for key column {column}")]
    MissingKey { kind: &'static str, column: String },
}
