//! Candles executor
//!
//! One watermark per tenant covers every ticker and interval.

use async_trait::async_trait;
use sea_orm::IntoActiveModel;
use tracing::debug;

use super::{
    BatchResult, Executor, ExecutorContext, fetch, persist_error, validate_time_series,
};
use crate::credentials::TenantKey;
use crate::error::{StorageError, SyncError};
use crate::models::candle;
use crate::provider::CandleRecord;
use crate::storage::{Storage, Watermark};

const KIND: &str = "candles";

pub struct CandlesExecutor;

fn to_model(record: CandleRecord, tenant: &TenantKey) -> candle::ActiveModel {
    candle::Model {
        username: tenant.to_string(),
        ticker: record.ticker,
        interval: record.interval,
        time: record.time,
        open: record.open,
        close: record.close,
        high: record.high,
        low: record.low,
        volume: record.volume,
    }
    .into_active_model()
}

#[async_trait]
impl Executor for CandlesExecutor {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn validate(&self) -> Result<(), StorageError> {
        validate_time_series::<candle::Entity>()
    }

    async fn watermark(
        &self,
        storage: &Storage,
        tenant: &TenantKey,
    ) -> Result<Watermark, StorageError> {
        storage.latest_time::<candle::Entity>(tenant).await
    }

    async fn run(
        &self,
        ctx: &ExecutorContext<'_>,
        since: Watermark,
    ) -> Result<BatchResult, SyncError> {
        let records = fetch(ctx, KIND, ctx.session.candles(since)).await?;
        let fetched = records.len();
        debug!(tenant = %ctx.tenant, fetched, "Fetched candles");

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
            summary: format!("{} new candles", fetched),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executors::testing::{at, session_with};
    use crate::provider::memory::ProviderData;
    use crate::storage::test_storage;
    use tokio_util::sync::CancellationToken;

    fn record(ticker: &str, day: u32) -> CandleRecord {
        CandleRecord {
            ticker: ticker.to_string(),
            interval: "day".to_string(),
            time: at(day, 0),
            open: 100.0,
            close: 101.0,
            high: 102.0,
            low: 99.0,
            volume: 1_000,
        }
    }

    #[tokio::test]
    async fn test_rerun_with_same_watermark_is_idempotent() {
        let storage = test_storage(100).await;
        let tenant = TenantKey::new("acct1");
        let (_provider, session) = session_with(ProviderData {
            candles: vec![record("SBER", 1), record("SBER", 2), record("GAZP", 2)],
            ..ProviderData::default()
        })
        .await;
        let cancel = CancellationToken::new();
        let ctx = ExecutorContext {
            session: session.as_ref(),
            storage: &storage,
            tenant: &tenant,
            cancel: &cancel,
        };
        let executor = CandlesExecutor;

        let first = executor.run(&ctx, None).await.unwrap();
        let second = executor.run(&ctx, None).await.unwrap();

        assert_eq!(first.summary, second.summary);
        assert_eq!(second.outcome.deleted, 3);
        assert_eq!(storage.count::<candle::Entity>(&tenant).await.unwrap(), 3);
        assert_eq!(
            executor.watermark(&storage, &tenant).await.unwrap(),
            Some(at(2, 0))
        );
    }
}
