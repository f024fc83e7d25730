//! Operations executor
//!
//! Fetches operations newer than the watermark together with the shopping
//! receipt of every operation that has one. Operations, their loyalty
//! bonuses, receipts and receipt items are reconciled in a single transaction.
//! Nested rows of a replaced parent are cleared first so a shorter corrected
//! list leaves nothing stale behind.

use async_trait::async_trait;
use sea_orm::IntoActiveModel;
use tracing::debug;

use super::{
    BatchResult, Executor, ExecutorContext, fetch, persist_error, validate_time_series,
};
use crate::credentials::TenantKey;
use crate::error::{StorageError, SyncError};
use crate::models::{
    operation, operation_loyalty_bonus, shopping_receipt, shopping_receipt_item,
};
use crate::provider::{OperationRecord, ShoppingReceiptRecord};
use crate::storage::{Storage, SyncedEntity, Watermark};

const KIND: &str = "operations";

pub struct OperationsExecutor;

fn to_model(record: OperationRecord, tenant: &TenantKey) -> operation::ActiveModel {
    operation::Model {
        id: record.id,
        username: tenant.to_string(),
        account_id: record.account_id,
        debiting_time: record.debiting_time,
        description: record.description,
        category: record.category,
        amount: record.amount,
        currency: record.currency,
        status: record.status,
        has_shopping_receipt: record.has_shopping_receipt,
    }
    .into_active_model()
}

fn bonus_models(
    record: &mut OperationRecord,
    tenant: &TenantKey,
) -> Vec<operation_loyalty_bonus::ActiveModel> {
    std::mem::take(&mut record.loyalty_bonuses)
        .into_iter()
        .enumerate()
        .map(|(position, bonus)| {
            operation_loyalty_bonus::Model {
                username: tenant.to_string(),
                operation_id: record.id.clone(),
                position: position as i32,
                description: bonus.description,
                loyalty_type: bonus.loyalty_type,
                amount: bonus.amount,
                program_id: bonus.program_id,
            }
            .into_active_model()
        })
        .collect()
}

fn receipt_models(
    record: ShoppingReceiptRecord,
    tenant: &TenantKey,
) -> (
    shopping_receipt::ActiveModel,
    Vec<shopping_receipt_item::ActiveModel>,
) {
    let items = record
        .items
        .into_iter()
        .enumerate()
        .map(|(position, item)| {
            shopping_receipt_item::Model {
                operation_id: record.operation_id.clone(),
                position: position as i32,
                username: tenant.to_string(),
                name: item.name,
                price: item.price,
                quantity: item.quantity,
                sum: item.sum,
            }
            .into_active_model()
        })
        .collect();

    let receipt = shopping_receipt::Model {
        operation_id: record.operation_id,
        username: tenant.to_string(),
        receipt_time: record.receipt_time,
        retail_place: record.retail_place,
        total_sum: record.total_sum,
    }
    .into_active_model();

    (receipt, items)
}

#[async_trait]
impl Executor for OperationsExecutor {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn validate(&self) -> Result<(), StorageError> {
        validate_time_series::<operation::Entity>()?;
        validate_time_series::<shopping_receipt::Entity>()?;
        operation_loyalty_bonus::Entity::descriptor().validate()?;
        shopping_receipt_item::Entity::descriptor().validate()
    }

    async fn watermark(
        &self,
        storage: &Storage,
        tenant: &TenantKey,
    ) -> Result<Watermark, StorageError> {
        storage.latest_time::<operation::Entity>(tenant).await
    }

    async fn run(
        &self,
        ctx: &ExecutorContext<'_>,
        since: Watermark,
    ) -> Result<BatchResult, SyncError> {
        let records = fetch(ctx, KIND, ctx.session.operations(since)).await?;
        let fetched = records.len();

        let mut receipts = Vec::new();
        let mut receipt_ids = Vec::new();
        let mut items = Vec::new();
        for record in records.iter().filter(|record| record.has_shopping_receipt) {
            let receipt = fetch(ctx, KIND, ctx.session.shopping_receipt(&record.id)).await?;
            if let Some(receipt) = receipt {
                let (receipt, receipt_items) = receipt_models(receipt, ctx.tenant);
                receipts.push(receipt);
                receipt_ids.push(record.id.clone());
                items.extend(receipt_items);
            }
        }
        debug!(
            tenant = %ctx.tenant,
            fetched,
            receipts = receipts.len(),
            "Fetched operations"
        );

        let receipt_count = receipts.len();
        let mut bonuses = Vec::new();
        let mut operation_ids = Vec::with_capacity(fetched);
        let operations = records
            .into_iter()
            .map(|mut record| {
                bonuses.extend(bonus_models(&mut record, ctx.tenant));
                operation_ids.push(record.id.clone());
                to_model(record, ctx.tenant)
            })
            .collect::<Vec<_>>();

        let mut tx = ctx.storage.begin().await.map_err(persist_error(KIND))?;
        tx.replace(operations).await.map_err(persist_error(KIND))?;
        tx.remove_children::<operation_loyalty_bonus::Entity>(
            operation_loyalty_bonus::Column::OperationId,
            operation_ids,
            ctx.tenant,
        )
        .await
        .map_err(persist_error(KIND))?;
        tx.replace(bonuses).await.map_err(persist_error(KIND))?;
        tx.replace(receipts).await.map_err(persist_error(KIND))?;
        tx.remove_children::<shopping_receipt_item::Entity>(
            shopping_receipt_item::Column::OperationId,
            receipt_ids,
            ctx.tenant,
        )
        .await
        .map_err(persist_error(KIND))?;
        tx.replace(items).await.map_err(persist_error(KIND))?;
        let outcome = tx.commit().await.map_err(persist_error(KIND))?;

        let mut summary = format!("{} new operations", fetched);
        if receipt_count > 0 {
            summary.push_str(&format!(", {} shopping receipts", receipt_count));
        }

        Ok(BatchResult {
            kind: KIND,
            fetched,
            outcome,
            summary,
        })
    }
}
