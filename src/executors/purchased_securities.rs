//! Purchased securities executor

use async_trait::async_trait;
use sea_orm::IntoActiveModel;
use tracing::debug;

use super::{
    BatchResult, Executor, ExecutorContext, fetch, persist_error, validate_time_series,
};
use crate::credentials::TenantKey;
use crate::error::{StorageError, SyncError};
use crate::models::purchased_security;
use crate::provider::PurchasedSecurityRecord;
use crate::storage::{Storage, Watermark};

const KIND: &str = "purchased_securities";

pub struct PurchasedSecuritiesExecutor;

fn to_model(
    record: PurchasedSecurityRecord,
    tenant: &TenantKey,
) -> purchased_security::ActiveModel {
    purchased_security::Model {
        id: record.id,
        username: tenant.to_string(),
        ticker: record.ticker,
        purchase_time: record.purchase_time,
        quantity: record.quantity,
        price: record.price,
        currency: record.currency,
    }
    .into_active_model()
}

#[async_trait]
impl Executor for PurchasedSecuritiesExecutor {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn validate(&self) -> Result<(), StorageError> {
        validate_time_series::<purchased_security::Entity>()
    }

    async fn watermark(
        &self,
        storage: &Storage,
        tenant: &TenantKey,
    ) -> Result<Watermark, StorageError> {
        storage.latest_time::<purchased_security::Entity>(tenant).await
    }

    async fn run(
        &self,
        ctx: &ExecutorContext<'_>,
        since: Watermark,
    ) -> Result<BatchResult, SyncError> {
        let records = fetch(ctx, KIND, ctx.session.purchased_securities(since)).await?;
        let fetched = records.len();
        debug!(tenant = %ctx.tenant, fetched, "Fetched purchased securities");

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
            summary: format!("{} new purchased securities", fetched),
        })
    }
}
