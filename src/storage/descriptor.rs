//! Per-entity-kind descriptors.
//!
//! Every synced entity names its tenant columns and, for time-series kinds,
//! the column that acts as the watermark. Primary keys come from the entity
//! definition itself.

use sea_orm::{ColumnTrait, EntityTrait, IdenStatic, QueryFilter, Value};

use crate::error::StorageError;

/// Tenant and watermark columns of one entity kind.
#[derive(Debug, Clone)]
pub struct EntityDescriptor<E: EntityTrait> {
    kind: &'static str,
    tenant: Vec<E::Column>,
    time: Option<E::Column>,
}

impl<E: EntityTrait> EntityDescriptor<E> {
    pub fn new(kind: &'static str, tenant: Vec<E::Column>, time: Option<E::Column>) -> Self {
        Self { kind, tenant, time }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn tenant_columns(&self) -> &[E::Column] {
        &self.tenant
    }

    pub fn is_time_series(&self) -> bool {
        self.time.is_some()
    }

    /// Watermark column, or `NoWatermarkField` for kinds without one.
    pub fn time_column(&self) -> Result<E::Column, StorageError> {
        self.time
            .ok_or(StorageError::NoWatermarkField { kind: self.kind })
    }

    /// Structural checks run once at startup.
    pub fn validate(&self) -> Result<(), StorageError> {
        if self.tenant.is_empty() {
            return Err(StorageError::InvalidDescriptor {
                kind: self.kind,
                reason: "no tenant columns declared".to_string(),
            });
        }

        if let Some(time) = self.time
            && self.tenant.iter().any(|column| column.as_str() == time.as_str())
        {
            return Err(StorageError::InvalidDescriptor {
                kind: self.kind,
                reason: format!("column {} is both tenant and watermark", time.as_str()),
            });
        }

        Ok(())
    }

    /// Apply one equality filter per tenant column.
    pub fn tenant_filter<Q: QueryFilter>(
        &self,
        query: Q,
        values: &[Value],
    ) -> Result<Q, StorageError> {
        if self.tenant.len() != values.len() {
            return Err(StorageError::TenantMismatch {
                kind: self.kind,
                expected: self.tenant.len(),
                actual: values.len(),
            });
        }

        Ok(self
            .tenant
            .iter()
            .zip(values)
            .fold(query, |query, (column, value)| {
                query.filter(column.eq(value.clone()))
            }))
    }
}

/// An entity kind the sync pipeline can persist and watermark.
pub trait SyncedEntity: EntityTrait {
    fn descriptor() -> EntityDescriptor<Self>;
}
