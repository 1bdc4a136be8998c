//! In-memory distribution store for tests/dev.
//!
//! One mutex guards all tables. A [`PlanTransaction`] holds the lock for its
//! whole lifetime and works on a copy, which replaces the tables on commit.
//! Transactions are therefore fully serialized, standing in for the database
//! isolation the Postgres backend relies on.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use stockshift_core::{ProductId, RequestId, ShipmentId, SupplyId, WarehouseId};
use stockshift_distribution::capacity::line_volume;
use stockshift_distribution::{
    ApplyResult, PlanApplication, PlannedShipment, Product, Shipment, ShipmentItem,
    ShipmentStatus, Supply, SupplyStatus, UnallocatedItem, UnallocatedRecord, VolumeTotals,
    Warehouse, SYSTEM_ACTOR,
};

use super::{DistributionStore, NewSupply, PlanTransaction, StoreError};

#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: i64,
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    products: BTreeMap<ProductId, Product>,
    supplies: BTreeMap<SupplyId, Supply>,
    shipments: BTreeMap<ShipmentId, Shipment>,
    applications: HashMap<RequestId, PlanApplication>,
    unallocated: Vec<UnallocatedRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn unit_volume(&self, product_id: ProductId) -> f64 {
        self.products.get(&product_id).map(|p| p.volume_m3).unwrap_or(0.0)
    }

    fn totals(&self, warehouse_id: WarehouseId) -> VolumeTotals {
        let allocated = self
            .shipments
            .values()
            .filter(|s| s.destination_id == warehouse_id && s.status.counts_as_allocated())
            .flat_map(|s| s.items.iter())
            .map(|i| line_volume(i.quantity, self.unit_volume(i.product_id)))
            .sum();

        let pending = self
            .supplies
            .values()
            .filter(|s| s.warehouse_id == warehouse_id && s.is_pending())
            .flat_map(|s| s.items.iter())
            .map(|i| line_volume(i.quantity, self.unit_volume(i.product_id)))
            .sum();

        VolumeTotals { allocated, pending }
    }
}

/// In-memory [`DistributionStore`].
///
/// Ids come from a single sequence shared by all tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDistributionStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryDistributionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force a shipment's status (stands in for the operational events that
    /// move shipments along outside this service).
    pub async fn set_shipment_status(&self, id: ShipmentId, status: ShipmentStatus) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.shipments.get_mut(&id) {
            Some(shipment) => {
                shipment.status = status;
                shipment.last_modified_at = Utc::now();
                true
            }
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl DistributionStore for InMemoryDistributionStore {
    async fn begin(&self) -> Result<Box<dyn PlanTransaction>, StoreError> {
        let guard = self.tables.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(Box::new(InMemoryPlanTransaction {
            guard,
            working,
            claimed: None,
        }))
    }

    async fn find_supply(&self, id: SupplyId) -> Result<Option<Supply>, StoreError> {
        Ok(self.tables.lock().await.supplies.get(&id).cloned())
    }

    async fn find_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        Ok(self.tables.lock().await.warehouses.get(&id).cloned())
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        Ok(self.tables.lock().await.warehouses.values().cloned().collect())
    }

    async fn capacity_rows(
        &self,
        only: Option<WarehouseId>,
    ) -> Result<Vec<(Warehouse, VolumeTotals)>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .warehouses
            .values()
            .filter(|w| only.is_none_or(|id| w.id == id))
            .map(|w| (w.clone(), tables.totals(w.id)))
            .collect())
    }

    async fn list_shipments(&self) -> Result<Vec<Shipment>, StoreError> {
        Ok(self.tables.lock().await.shipments.values().cloned().collect())
    }

    async fn find_plan_application(
        &self,
        request_id: RequestId,
    ) -> Result<Option<PlanApplication>, StoreError> {
        Ok(self.tables.lock().await.applications.get(&request_id).cloned())
    }

    async fn list_unallocated(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<UnallocatedRecord>, StoreError> {
        Ok(self
            .tables
            .lock()
            .await
            .unallocated
            .iter()
            .filter(|r| r.request_id == request_id)
            .cloned()
            .collect())
    }

    async fn create_warehouse(&self, total_capacity_m3: f64) -> Result<Warehouse, StoreError> {
        let mut tables = self.tables.lock().await;
        let warehouse = Warehouse {
            id: WarehouseId::new(tables.next_id()),
            total_capacity_m3,
        };
        tables.warehouses.insert(warehouse.id, warehouse.clone());
        Ok(warehouse)
    }

    async fn create_product(&self, volume_m3: f64) -> Result<Product, StoreError> {
        let mut tables = self.tables.lock().await;
        let product = Product {
            id: ProductId::new(tables.next_id()),
            volume_m3,
        };
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn register_supply(&self, supply: NewSupply) -> Result<Supply, StoreError> {
        let mut tables = self.tables.lock().await;

        if !tables.warehouses.contains_key(&supply.warehouse_id) {
            return Err(StoreError::MissingReference(format!(
                "warehouse {}",
                supply.warehouse_id
            )));
        }
        if let Some(item) = supply.items.iter().find(|i| !tables.products.contains_key(&i.product_id)) {
            return Err(StoreError::MissingReference(format!("product {}", item.product_id)));
        }

        let supply = Supply {
            id: SupplyId::new(tables.next_id()),
            warehouse_id: supply.warehouse_id,
            status: SupplyStatus::Received,
            arrival_date: supply.arrival_date,
            created_by: Some(supply.created_by),
            items: supply.items,
        };
        tables.supplies.insert(supply.id, supply.clone());
        Ok(supply)
    }
}

struct InMemoryPlanTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    claimed: Option<RequestId>,
}

#[async_trait::async_trait]
impl PlanTransaction for InMemoryPlanTransaction {
    async fn claim(
        &mut self,
        request_id: RequestId,
        _source: WarehouseId,
    ) -> Result<Option<ApplyResult>, StoreError> {
        if let Some(existing) = self.working.applications.get(&request_id) {
            return Ok(Some(existing.result));
        }
        self.claimed = Some(request_id);
        Ok(None)
    }

    async fn missing_warehouses(&mut self, ids: &[WarehouseId]) -> Result<Vec<WarehouseId>, StoreError> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !self.working.warehouses.contains_key(id))
            .collect())
    }

    async fn missing_products(&mut self, ids: &[ProductId]) -> Result<Vec<ProductId>, StoreError> {
        Ok(ids
            .iter()
            .copied()
            .filter(|id| !self.working.products.contains_key(id))
            .collect())
    }

    async fn insert_shipment(
        &mut self,
        request_id: RequestId,
        source: WarehouseId,
        planned: &PlannedShipment,
        at: DateTime<Utc>,
    ) -> Result<ShipmentId, StoreError> {
        let id = ShipmentId::new(self.working.next_id());
        let shipment = Shipment {
            id,
            request_id: Some(request_id),
            source_id: source,
            destination_id: planned.destination,
            status: ShipmentStatus::Planned,
            created_by: SYSTEM_ACTOR.to_string(),
            created_at: at,
            last_modified_by: SYSTEM_ACTOR.to_string(),
            last_modified_at: at,
            items: planned
                .items
                .iter()
                .map(|i| ShipmentItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
        };
        self.working.shipments.insert(id, shipment);
        Ok(id)
    }

    async fn mark_supply_processed(
        &mut self,
        supply_id: SupplyId,
        source: WarehouseId,
    ) -> Result<bool, StoreError> {
        match self.working.supplies.get_mut(&supply_id) {
            Some(supply) if supply.status == SupplyStatus::Received && supply.warehouse_id == source => {
                supply.status = SupplyStatus::Processed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_unallocated(
        &mut self,
        request_id: RequestId,
        item: &UnallocatedItem,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.working.unallocated.push(UnallocatedRecord {
            request_id,
            product_id: item.product_id.clone(),
            volume_m3: item.volume_m3,
            reason: item.reason.clone(),
            recorded_at: at,
        });
        Ok(())
    }

    async fn record_outcome(&mut self, application: &PlanApplication) -> Result<(), StoreError> {
        if self.claimed != Some(application.request_id) {
            return Err(StoreError::Backend(format!(
                "request {} was not claimed by this transaction",
                application.request_id
            )));
        }
        if self.working.applications.contains_key(&application.request_id) {
            return Err(StoreError::Conflict(format!(
                "request {} already applied",
                application.request_id
            )));
        }
        self.working
            .applications
            .insert(application.request_id, application.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryPlanTransaction {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockshift_distribution::{PlannedItem, SupplyItem};

    fn req() -> RequestId {
        RequestId::generate()
    }

    #[tokio::test]
    async fn dropped_transaction_leaves_tables_untouched() {
        let store = InMemoryDistributionStore::new();
        let a = store.create_warehouse(100.0).await.unwrap();
        let b = store.create_warehouse(100.0).await.unwrap();
        let p = store.create_product(1.0).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.claim(req(), a.id).await.unwrap();
            tx.insert_shipment(
                req(),
                a.id,
                &PlannedShipment {
                    destination: b.id,
                    items: vec![PlannedItem { product_id: p.id, quantity: 4 }],
                },
                Utc::now(),
            )
            .await
            .unwrap();
        }

        assert!(store.list_shipments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn capacity_rows_sum_allocated_and_pending_volume() {
        let store = InMemoryDistributionStore::new();
        let hub = store.create_warehouse(500.0).await.unwrap();
        let dest = store.create_warehouse(200.0).await.unwrap();
        let p = store.create_product(0.5).await.unwrap();

        store
            .register_supply(NewSupply {
                warehouse_id: hub.id,
                arrival_date: None,
                created_by: "keeper".into(),
                items: vec![SupplyItem { product_id: p.id, quantity: 10 }],
            })
            .await
            .unwrap();

        let request_id = req();
        let mut tx = store.begin().await.unwrap();
        tx.claim(request_id, hub.id).await.unwrap();
        let shipment_id = tx
            .insert_shipment(
                request_id,
                hub.id,
                &PlannedShipment {
                    destination: dest.id,
                    items: vec![PlannedItem { product_id: p.id, quantity: 6 }],
                },
                Utc::now(),
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let rows = store.capacity_rows(None).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].1, VolumeTotals { allocated: 0.0, pending: 5.0 });
        assert_eq!(rows[1].1, VolumeTotals { allocated: 3.0, pending: 0.0 });

        assert!(store.set_shipment_status(shipment_id, ShipmentStatus::Delivered).await);
        let only = store.capacity_rows(Some(dest.id)).await.unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].1.allocated, 0.0);
    }

    #[tokio::test]
    async fn supply_registration_requires_existing_references() {
        let store = InMemoryDistributionStore::new();
        let err = store
            .register_supply(NewSupply {
                warehouse_id: WarehouseId::new(42),
                arrival_date: None,
                created_by: "keeper".into(),
                items: vec![],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
    }
}
