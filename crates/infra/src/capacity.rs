//! Read-side capacity reporting.

use tracing::{instrument, warn};

use stockshift_core::{DomainError, DomainResult, WarehouseId};
use stockshift_distribution::CapacitySnapshot;

use crate::store::DistributionStore;

/// Loads allocated/pending volume from storage and computes snapshots.
///
/// Read-only; never runs inside a plan transaction.
pub struct CapacityAggregator<S> {
    store: S,
}

impl<S> CapacityAggregator<S>
where
    S: DistributionStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(skip(self), fields(warehouse_id = %warehouse_id), err)]
    pub async fn snapshot(&self, warehouse_id: WarehouseId) -> DomainResult<CapacitySnapshot> {
        let rows = self.store.capacity_rows(Some(warehouse_id)).await?;
        rows.into_iter()
            .next()
            .map(|(warehouse, totals)| flag_overcommitted(CapacitySnapshot::from_totals(&warehouse, totals)))
            .ok_or_else(|| DomainError::not_found(format!("warehouse {warehouse_id}")))
    }

    /// One snapshot per warehouse, ordered by warehouse id.
    pub async fn snapshot_all(&self) -> DomainResult<Vec<CapacitySnapshot>> {
        let rows = self.store.capacity_rows(None).await?;
        Ok(rows
            .iter()
            .map(|(warehouse, totals)| flag_overcommitted(CapacitySnapshot::from_totals(warehouse, *totals)))
            .collect())
    }
}

/// Allocated plus pending volume above capacity is reported, not rejected.
fn flag_overcommitted(snapshot: CapacitySnapshot) -> CapacitySnapshot {
    if snapshot.is_overcommitted() {
        warn!(
            warehouse_id = %snapshot.warehouse_id,
            total = snapshot.total,
            allocated = snapshot.allocated,
            pending = snapshot.pending,
            "warehouse overcommitted"
        );
    }
    snapshot
}
