//! # Storage Engine
//!
//! Transactional replace-on-conflict persistence for synced batches, watermark
//! resolution and tenant-scoped reporting queries.
//!
//! A reconcile deletes every stored row that shares a primary key and tenant
//! with the incoming batch and then inserts the batch, inside one transaction.
//! The whole batch is replaced, not just the overlap with stored rows.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, Order, Query};
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, DatabaseTransaction, EntityTrait, FromQueryResult, IdenStatic,
    IntoActiveModel, Iterable, ModelTrait, PaginatorTrait, PrimaryKeyToColumn, QueryFilter,
    QueryOrder, TransactionTrait, Value,
};
use tracing::debug;

pub mod descriptor;

pub use descriptor::{EntityDescriptor, SyncedEntity};

pub use crate::error::StorageError;
use crate::credentials::TenantKey;
use crate::models::TradingPosition;

/// Latest persisted timestamp for one tenant and kind; `None` means "from the beginning".
pub type Watermark = Option<DateTime<Utc>>;

/// Default number of rows per INSERT statement.
pub const DEFAULT_INSERT_CHUNK_SIZE: usize = 100;

/// Row counts of a committed reconcile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub deleted: u64,
    pub inserted: u64,
}

impl ReconcileOutcome {
    fn absorb(&mut self, other: ReconcileOutcome) {
        self.deleted += other.deleted;
        self.inserted += other.inserted;
    }
}

/// Shared handle to the system of record.
#[derive(Debug, Clone)]
pub struct Storage {
    db: DatabaseConnection,
    chunk_size: usize,
}

impl Storage {
    pub fn new(db: DatabaseConnection, chunk_size: usize) -> Self {
        Self {
            db,
            chunk_size: chunk_size.max(1),
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Open a reconcile transaction. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> Result<ReconcileTx, StorageError> {
        let txn = self.db.begin().await?;
        Ok(ReconcileTx {
            txn,
            chunk_size: self.chunk_size,
            outcome: ReconcileOutcome::default(),
        })
    }

    /// Replace one batch atomically.
    pub async fn reconcile<A>(&self, batch: Vec<A>) -> Result<ReconcileOutcome, StorageError>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + Clone,
        A::Entity: SyncedEntity,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        let mut tx = self.begin().await?;
        tx.replace(batch).await?;
        tx.commit().await
    }

    /// Watermark for the single-column tenant scope used by every synced kind.
    pub async fn latest_time<E: SyncedEntity>(
        &self,
        tenant: &TenantKey,
    ) -> Result<Watermark, StorageError> {
        self.latest_time_scoped::<E>(&[Value::from(tenant)]).await
    }

    /// Maximum watermark column value over rows matching the tenant values,
    /// one value per declared tenant column.
    pub async fn latest_time_scoped<E: SyncedEntity>(
        &self,
        tenant: &[Value],
    ) -> Result<Watermark, StorageError> {
        let descriptor = E::descriptor();
        let time = descriptor.time_column()?;
        let query = descriptor.tenant_filter(E::find(), tenant)?;

        let latest = query.order_by_desc(time).one(&self.db).await?;
        let watermark = latest.and_then(|model| timestamp_of(model.get(time)));

        debug!(kind = descriptor.kind(), ?watermark, "Resolved watermark");
        Ok(watermark)
    }

    /// Number of stored rows of one kind for a tenant.
    pub async fn count<E: SyncedEntity>(&self, tenant: &TenantKey) -> Result<u64, StorageError>
    where
        E::Model: Sync,
    {
        let descriptor = E::descriptor();
        let query = descriptor.tenant_filter(E::find(), &[Value::from(tenant)])?;
        Ok(query.count(&self.db).await?)
    }

    /// Positions of a tenant that are still open or were closed at or after `from`.
    pub async fn trading_positions(
        &self,
        from: DateTime<Utc>,
        username: &TenantKey,
    ) -> Result<Vec<TradingPosition>, StorageError> {
        let sell_time = Alias::new("sell_time");
        let query = Query::select()
            .columns([
                Alias::new("username"),
                Alias::new("ticker"),
                Alias::new("buy_time"),
                sell_time.clone(),
                Alias::new("quantity"),
            ])
            .from(Alias::new("trading_positions"))
            .and_where(
                Expr::col(sell_time.clone())
                    .is_null()
                    .or(Expr::col(sell_time).gte(from)),
            )
            .and_where(Expr::col(Alias::new("username")).eq(username.as_str()))
            .order_by(Alias::new("ticker"), Order::Asc)
            .to_owned();

        let statement = self.db.get_database_backend().build(&query);
        Ok(TradingPosition::find_by_statement(statement)
            .all(&self.db)
            .await?)
    }
}

/// An open reconcile transaction spanning one or more batches.
pub struct ReconcileTx {
    txn: DatabaseTransaction,
    chunk_size: usize,
    outcome: ReconcileOutcome,
}

impl ReconcileTx {
    /// Delete rows sharing primary key and tenant with `batch`, then insert
    /// `batch` in chunks.
    pub async fn replace<A>(&mut self, batch: Vec<A>) -> Result<ReconcileOutcome, StorageError>
    where
        A: ActiveModelTrait + ActiveModelBehavior + Send + Clone,
        A::Entity: SyncedEntity,
        <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    {
        let mut outcome = ReconcileOutcome::default();
        if batch.is_empty() {
            return Ok(outcome);
        }

        let descriptor = <A::Entity as SyncedEntity>::descriptor();
        for row in &batch {
            let mut key = Condition::all();
            for column in <A::Entity as EntityTrait>::PrimaryKey::iter().map(|pk| pk.into_column()) {
                key = key.add(column.eq(key_value(descriptor.kind(), row, column)?));
            }
            let tenant = descriptor
                .tenant_columns()
                .iter()
                .map(|column| key_value(descriptor.kind(), row, *column))
                .collect::<Result<Vec<_>, _>>()?;

            let result = descriptor
                .tenant_filter(<A::Entity as EntityTrait>::delete_many().filter(key), &tenant)?
                .exec(&self.txn)
                .await?;
            outcome.deleted += result.rows_affected;
        }

        for chunk in batch.chunks(self.chunk_size) {
            outcome.inserted += <A::Entity as EntityTrait>::insert_many(chunk.to_vec())
                .exec_without_returning(&self.txn)
                .await?;
        }

        self.outcome.absorb(outcome);
        Ok(outcome)
    }

    /// Delete the tenant's rows of `E` whose `parent` column is one of
    /// `parents`. Used to drop nested rows before their replacement lands.
    pub async fn remove_children<E: SyncedEntity>(
        &mut self,
        parent: E::Column,
        parents: Vec<String>,
        tenant: &TenantKey,
    ) -> Result<u64, StorageError> {
        if parents.is_empty() {
            return Ok(0);
        }

        let result = E::descriptor()
            .tenant_filter(
                E::delete_many().filter(parent.is_in(parents)),
                &[Value::from(tenant)],
            )?
            .exec(&self.txn)
            .await?;
        self.outcome.deleted += result.rows_affected;
        Ok(result.rows_affected)
    }

    pub async fn commit(self) -> Result<ReconcileOutcome, StorageError> {
        self.txn.commit().await?;
        Ok(self.outcome)
    }
}

/// Value of a key column on a row about to be reconciled.
fn key_value<A: ActiveModelTrait>(
    kind: &'static str,
    row: &A,
    column: <A::Entity as EntityTrait>::Column,
) -> Result<Value, StorageError> {
    row.get(column)
        .into_value()
        .ok_or_else(|| StorageError::MissingKey {
            kind,
            column: column.as_str().to_string(),
        })
}

fn timestamp_of(value: Value) -> Option<DateTime<Utc>> {
    match value {
        Value::ChronoDateTimeUtc(Some(time)) => Some(*time),
        Value::ChronoDateTimeWithTimeZone(Some(time)) => Some(time.with_timezone(&Utc)),
        Value::ChronoDateTimeLocal(Some(time)) => Some(time.with_timezone(&Utc)),
        Value::ChronoDateTime(Some(time)) => Some(time.and_utc()),
        _ => None,
    }
}

/// In-memory SQLite storage with all migrations applied.
#[cfg(test)]
pub(crate) async fn test_storage(chunk_size: usize) -> Storage {
    use migration::{Migrator, MigratorTrait};

    let db = sea_orm::Database::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");
    Storage::new(db, chunk_size)
}
