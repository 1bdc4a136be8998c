//! Relational storage for the distribution saga.
//!
//! Two seams:
//!
//! - [`DistributionStore`]: reads used by dispatch, reporting and admin, plus
//!   [`DistributionStore::begin`] to open a unit of work.
//! - [`PlanTransaction`]: the unit of work a plan is applied in. Everything
//!   written through it becomes visible on [`PlanTransaction::commit`] or not at
//!   all; dropping it without committing rolls back.
//!
//! Backends: [`InMemoryDistributionStore`] (tests/dev) and
//! [`PostgresDistributionStore`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use stockshift_core::{DomainError, ProductId, RequestId, ShipmentId, SupplyId, WarehouseId};
use stockshift_distribution::{
    ApplyResult, PlanApplication, PlannedShipment, Product, Shipment, Supply, SupplyItem,
    UnallocatedItem, UnallocatedRecord, VolumeTotals, Warehouse,
};

pub mod in_memory;
pub mod postgres;
pub mod schema;

pub use in_memory::InMemoryDistributionStore;
pub use postgres::PostgresDistributionStore;

/// Storage operation error.
///
/// Infrastructure failures only; "row does not exist" on a lookup is `Ok(None)`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Unique violation or serialization failure; the transaction may be retried.
    #[error("storage conflict: {0}")]
    Conflict(String),

    /// A foreign key pointed at a row that does not exist.
    #[error("missing reference: {0}")]
    MissingReference(String),

    /// The backend could not be reached (pool closed, I/O, timeout).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A row could not be decoded into the domain model.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("storage error: {0}")]
    Backend(String),
}

impl From<StoreError> for DomainError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            StoreError::MissingReference(msg) => DomainError::NotFound(msg),
            StoreError::Unavailable(msg) => DomainError::Unavailable(msg),
            StoreError::Corrupt(msg) | StoreError::Backend(msg) => DomainError::Internal(msg),
        }
    }
}

/// A new supply registered at a source warehouse.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSupply {
    pub warehouse_id: WarehouseId,
    pub arrival_date: Option<DateTime<Utc>>,
    pub created_by: String,
    pub items: Vec<SupplyItem>,
}

#[async_trait::async_trait]
pub trait DistributionStore: Send + Sync {
    /// Open a unit of work for applying one plan.
    async fn begin(&self) -> Result<Box<dyn PlanTransaction>, StoreError>;

    async fn find_supply(&self, id: SupplyId) -> Result<Option<Supply>, StoreError>;

    async fn find_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError>;

    /// All warehouses, ordered by id.
    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError>;

    /// Each warehouse (or just `only`) with its allocated and pending volume,
    /// ordered by warehouse id.
    async fn capacity_rows(
        &self,
        only: Option<WarehouseId>,
    ) -> Result<Vec<(Warehouse, VolumeTotals)>, StoreError>;

    /// All shipments with their items, ordered by id.
    async fn list_shipments(&self) -> Result<Vec<Shipment>, StoreError>;

    async fn find_plan_application(
        &self,
        request_id: RequestId,
    ) -> Result<Option<PlanApplication>, StoreError>;

    async fn list_unallocated(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<UnallocatedRecord>, StoreError>;

    async fn create_warehouse(&self, total_capacity_m3: f64) -> Result<Warehouse, StoreError>;

    async fn create_product(&self, volume_m3: f64) -> Result<Product, StoreError>;

    /// Register a supply in status RECEIVED.
    async fn register_supply(&self, supply: NewSupply) -> Result<Supply, StoreError>;
}

#[async_trait::async_trait]
impl<S> DistributionStore for Arc<S>
where
    S: DistributionStore + ?Sized,
{
    async fn begin(&self) -> Result<Box<dyn PlanTransaction>, StoreError> {
        (**self).begin().await
    }

    async fn find_supply(&self, id: SupplyId) -> Result<Option<Supply>, StoreError> {
        (**self).find_supply(id).await
    }

    async fn find_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        (**self).find_warehouse(id).await
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        (**self).list_warehouses().await
    }

    async fn capacity_rows(
        &self,
        only: Option<WarehouseId>,
    ) -> Result<Vec<(Warehouse, VolumeTotals)>, StoreError> {
        (**self).capacity_rows(only).await
    }

    async fn list_shipments(&self) -> Result<Vec<Shipment>, StoreError> {
        (**self).list_shipments().await
    }

    async fn find_plan_application(
        &self,
        request_id: RequestId,
    ) -> Result<Option<PlanApplication>, StoreError> {
        (**self).find_plan_application(request_id).await
    }

    async fn list_unallocated(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<UnallocatedRecord>, StoreError> {
        (**self).list_unallocated(request_id).await
    }

    async fn create_warehouse(&self, total_capacity_m3: f64) -> Result<Warehouse, StoreError> {
        (**self).create_warehouse(total_capacity_m3).await
    }

    async fn create_product(&self, volume_m3: f64) -> Result<Product, StoreError> {
        (**self).create_product(volume_m3).await
    }

    async fn register_supply(&self, supply: NewSupply) -> Result<Supply, StoreError> {
        (**self).register_supply(supply).await
    }
}

/// Unit of work for applying one plan.
#[async_trait::async_trait]
pub trait PlanTransaction: Send {
    /// Claim `request_id` for this transaction.
    ///
    /// Returns the stored result if the plan was already applied; the caller
    /// must then roll back. Concurrent claims of the same id are serialized by
    /// the backend.
    async fn claim(
        &mut self,
        request_id: RequestId,
        source: WarehouseId,
    ) -> Result<Option<ApplyResult>, StoreError>;

    /// Subset of `ids` with no warehouse row.
    async fn missing_warehouses(&mut self, ids: &[WarehouseId]) -> Result<Vec<WarehouseId>, StoreError>;

    /// Subset of `ids` with no product row.
    async fn missing_products(&mut self, ids: &[ProductId]) -> Result<Vec<ProductId>, StoreError>;

    /// Insert one PLANNED shipment and its items.
    async fn insert_shipment(
        &mut self,
        request_id: RequestId,
        source: WarehouseId,
        planned: &PlannedShipment,
        at: DateTime<Utc>,
    ) -> Result<ShipmentId, StoreError>;

    /// RECEIVED -> PROCESSED for a supply held at `source`. Returns `false`
    /// (and changes nothing) if the supply is absent, already processed, or
    /// held at another warehouse.
    async fn mark_supply_processed(
        &mut self,
        supply_id: SupplyId,
        source: WarehouseId,
    ) -> Result<bool, StoreError>;

    async fn record_unallocated(
        &mut self,
        request_id: RequestId,
        item: &UnallocatedItem,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Persist the outcome under its request id.
    async fn record_outcome(&mut self, application: &PlanApplication) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}

/// Map SQLx errors to `StoreError`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());

            match db_err.code().as_deref() {
                // unique violation, serialization failure, deadlock
                Some("23505") | Some("40001") | Some("40P01") => StoreError::Conflict(msg),
                // foreign key violation
                Some("23503") => StoreError::MissingReference(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {}", operation))
        }
        sqlx::Error::PoolTimedOut => {
            StoreError::Unavailable(format!("connection pool timed out in {}", operation))
        }
        sqlx::Error::Io(e) => StoreError::Unavailable(format!("i/o error in {}: {}", operation, e)),
        sqlx::Error::RowNotFound => {
            StoreError::Backend(format!("unexpected row not found in {}", operation))
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("decode error in {}: {}", operation, err))
        }
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_the_domain_taxonomy() {
        assert!(matches!(
            DomainError::from(StoreError::Conflict("x".into())),
            DomainError::Conflict(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::MissingReference("x".into())),
            DomainError::NotFound(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::Unavailable("x".into())),
            DomainError::Unavailable(_)
        ));
        assert!(matches!(
            DomainError::from(StoreError::Corrupt("x".into())),
            DomainError::Internal(_)
        ));
    }

    #[test]
    fn pool_closed_is_unavailable() {
        assert!(matches!(
            map_sqlx_error("begin", sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }
}
