//! Trading operations executor

use async_trait::async_trait;
use sea_orm::IntoActiveModel;
use tracing::debug;

use super::{
    BatchResult, Executor, ExecutorContext, fetch, persist_error, validate_time_series,
};
use crate::credentials::TenantKey;
use crate::error::{StorageError, SyncError};
use crate::models::trading_operation;
use crate::provider::TradingOperationRecord;
use crate::storage::{Storage, Watermark};

const KIND: &str = "trading_operations";

pub struct TradingOperationsExecutor;

fn to_model(record: TradingOperationRecord, tenant: &TenantKey) -> trading_operation::ActiveModel {
    trading_operation::Model {
        id: record.id,
        username: tenant.to_string(),
        date: record.date,
        operation_type: record.operation_type,
        ticker: record.ticker,
        quantity: record.quantity,
        price: record.price,
        payment: record.payment,
        currency: record.currency,
    }
    .into_active_model()
}

#[async_trait]
impl Executor for TradingOperationsExecutor {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn validate(&self) -> Result<(), StorageError> {
        validate_time_series::<trading_operation::Entity>()
    }

    async fn watermark(
        &self,
        storage: &Storage,
        tenant: &TenantKey,
    ) -> Result<Watermark, StorageError> {
        storage.latest_time::<trading_operation::Entity>(tenant).await
    }

    async fn run(
        &self,
        ctx: &ExecutorContext<'_>,
        since: Watermark,
    ) -> Result<BatchResult, SyncError> {
        let records = fetch(ctx, KIND, ctx.session.trading_operations(since)).await?;
        let fetched = records.len();
        debug!(tenant = %ctx.tenant, fetched, ?since, "Fetched trading operations");

        let batch = records
            .into_iter()
            .map(|record| to_model(record, ctx.tenant))
            .collect::<Vec<_>>();
        let outcome = ctx
            .storage
            .reconcile(batch)
            .await
            .map_err(persist_error(KIND))?;

        Ok(BatchResult {
            kind: KIND,
            fetched,
            outcome,
            summary: format!("{} new trading operations", fetched),
        })
    }
}
