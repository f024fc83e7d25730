//! Accounts executor
//!
//! Accounts carry no timestamp, so every run fetches the full list and
//! replaces it.

use async_trait::async_trait;
use sea_orm::IntoActiveModel;
use tracing::debug;

use super::{BatchResult, Executor, ExecutorContext, fetch, persist_error};
use crate::credentials::TenantKey;
use crate::error::{StorageError, SyncError};
use crate::models::account;
use crate::provider::AccountRecord;
use crate::storage::{Storage, SyncedEntity, Watermark};

const KIND: &str = "accounts";

pub struct AccountsExecutor;

fn to_model(record: AccountRecord, tenant: &TenantKey) -> account::ActiveModel {
    account::Model {
        id: record.id,
        username: tenant.to_string(),
        name: record.name,
        account_type: record.account_type,
        currency: record.currency,
        balance: record.balance,
    }
    .into_active_model()
}

#[async_trait]
impl Executor for AccountsExecutor {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn validate(&self) -> Result<(), StorageError> {
        account::Entity::descriptor().validate()
    }

    async fn watermark(
        &self,
        _storage: &Storage,
        _tenant: &TenantKey,
    ) -> Result<Watermark, StorageError> {
        Ok(None)
    }

    async fn run(
        &self,
        ctx: &ExecutorContext<'_>,
        _since: Watermark,
    ) -> Result<BatchResult, SyncError> {
        let records = fetch(ctx, KIND, ctx.session.accounts()).await?;
        let fetched = records.len();
        debug!(tenant = %ctx.tenant, fetched, "Fetched accounts");

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
            summary: format!("{} accounts", fetched),
        })
    }
}
