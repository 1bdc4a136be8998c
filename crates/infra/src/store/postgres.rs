//! Postgres-backed distribution store.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (serialization failure / deadlock) | `40001` / `40P01` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `MissingReference` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / PoolTimedOut / Io | N/A | `Unavailable` |
//! | Decode / ColumnDecode | N/A | `Corrupt` |
//!
//! ## Idempotency
//!
//! [`PlanTransaction::claim`] inserts the `plan_applications` row up front with
//! `ON CONFLICT DO NOTHING`. A racing duplicate blocks on the primary key until
//! the first transaction finishes: if it committed, the duplicate sees the
//! stored result; if it rolled back, the duplicate's insert goes through.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{instrument, Span};

use stockshift_core::{ProductId, RequestId, ShipmentId, SupplyId, WarehouseId};
use stockshift_distribution::{
    ApplyResult, PlanApplication, PlannedShipment, Product, Shipment, ShipmentItem,
    ShipmentStatus, Supply, SupplyItem, SupplyStatus, UnallocatedItem, UnallocatedRecord,
    VolumeTotals, Warehouse, SYSTEM_ACTOR,
};

use super::schema;
use super::{map_sqlx_error, DistributionStore, NewSupply, PlanTransaction, StoreError};

#[derive(Debug, Clone)]
pub struct PostgresDistributionStore {
    pool: Arc<PgPool>,
}

impl PostgresDistributionStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect a pool to `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and indexes. Safe to call multiple times.
    pub async fn init_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(schema::CREATE_TABLES)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_tables", e))?;
        sqlx::raw_sql(schema::CREATE_INDEXES)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_indexes", e))?;
        Ok(())
    }

    async fn load_supply_items(&self, supply_id: SupplyId) -> Result<Vec<SupplyItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT product_id, quantity FROM supply_items WHERE supply_id = $1 ORDER BY id",
        )
        .bind(supply_id.get())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("load_supply_items", e))?;

        rows.iter()
            .map(|row| {
                Ok(SupplyItem {
                    product_id: ProductId::new(row.try_get("product_id").map_err(corrupt)?),
                    quantity: row.try_get("quantity").map_err(corrupt)?,
                })
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl DistributionStore for PostgresDistributionStore {
    async fn begin(&self) -> Result<Box<dyn PlanTransaction>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        Ok(Box::new(PostgresPlanTransaction { tx }))
    }

    #[instrument(skip(self), fields(supply_id = %id), err)]
    async fn find_supply(&self, id: SupplyId) -> Result<Option<Supply>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, warehouse_id, status, arrival_date, created_by
            FROM supplies
            WHERE id = $1
            "#,
        )
        .bind(id.get())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_supply", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let header = SupplyRow::from_row(&row).map_err(corrupt)?;
        let items = self.load_supply_items(id).await?;
        header.into_supply(items).map(Some)
    }

    async fn find_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        let row = sqlx::query("SELECT id, total_capacity FROM warehouses WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_warehouse", e))?;

        row.map(|r| WarehouseRow::from_row(&r).map(Warehouse::from).map_err(corrupt))
            .transpose()
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        let rows = sqlx::query("SELECT id, total_capacity FROM warehouses ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_warehouses", e))?;

        rows.iter()
            .map(|r| WarehouseRow::from_row(r).map(Warehouse::from).map_err(corrupt))
            .collect()
    }

    #[instrument(skip(self), fields(warehouse_id = ?only, row_count = tracing::field::Empty), err)]
    async fn capacity_rows(
        &self,
        only: Option<WarehouseId>,
    ) -> Result<Vec<(Warehouse, VolumeTotals)>, StoreError> {
        let rows = sqlx::query(
            r#"
            WITH allocated_agg AS (
                SELECT s.destination_id AS warehouse_id,
                       SUM(si.quantity * p.volume_m3) AS allocated
                FROM shipments s
                JOIN shipment_items si ON si.shipment_id = s.id
                JOIN products p ON p.id = si.product_id
                WHERE s.status IN ('PLANNED', 'IN_TRANSIT')
                GROUP BY s.destination_id
            ),
            pending_agg AS (
                SELECT sp.warehouse_id,
                       SUM(si.quantity * p.volume_m3) AS pending
                FROM supplies sp
                JOIN supply_items si ON si.supply_id = sp.id
                JOIN products p ON p.id = si.product_id
                WHERE sp.status = 'RECEIVED'
                GROUP BY sp.warehouse_id
            )
            SELECT w.id,
                   w.total_capacity,
                   COALESCE(a.allocated, 0)::DOUBLE PRECISION AS allocated,
                   COALESCE(pa.pending, 0)::DOUBLE PRECISION AS pending
            FROM warehouses w
            LEFT JOIN allocated_agg a ON a.warehouse_id = w.id
            LEFT JOIN pending_agg pa ON pa.warehouse_id = w.id
            WHERE ($1::BIGINT IS NULL OR w.id = $1)
            ORDER BY w.id
            "#,
        )
        .bind(only.map(WarehouseId::get))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("capacity_rows", e))?;

        Span::current().record("row_count", rows.len());

        rows.iter()
            .map(|row| {
                let warehouse = Warehouse::from(WarehouseRow::from_row(row).map_err(corrupt)?);
                let totals = VolumeTotals {
                    allocated: row.try_get("allocated").map_err(corrupt)?,
                    pending: row.try_get("pending").map_err(corrupt)?,
                };
                Ok((warehouse, totals))
            })
            .collect()
    }

    async fn list_shipments(&self) -> Result<Vec<Shipment>, StoreError> {
        let headers = sqlx::query(
            r#"
            SELECT id, request_id, source_id, destination_id, status,
                   created_by, created_at, last_modified_by, last_modified_at
            FROM shipments
            ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_shipments", e))?;

        let item_rows = sqlx::query(
            "SELECT shipment_id, product_id, quantity FROM shipment_items ORDER BY shipment_id, id",
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_shipment_items", e))?;

        let mut items: HashMap<i64, Vec<ShipmentItem>> = HashMap::new();
        for row in &item_rows {
            let shipment_id: i64 = row.try_get("shipment_id").map_err(corrupt)?;
            items.entry(shipment_id).or_default().push(ShipmentItem {
                product_id: ProductId::new(row.try_get("product_id").map_err(corrupt)?),
                quantity: row.try_get("quantity").map_err(corrupt)?,
            });
        }

        headers
            .iter()
            .map(|row| {
                let header = ShipmentRow::from_row(row).map_err(corrupt)?;
                let lines = items.remove(&header.id).unwrap_or_default();
                header.into_shipment(lines)
            })
            .collect()
    }

    async fn find_plan_application(
        &self,
        request_id: RequestId,
    ) -> Result<Option<PlanApplication>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT request_id, source_warehouse_id, supply_id,
                   shipments_created, unallocated_recorded, applied_at
            FROM plan_applications
            WHERE request_id = $1
            "#,
        )
        .bind(request_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_plan_application", e))?;

        match row {
            Some(row) => {
                let application = PlanApplicationRow::from_row(&row).map_err(corrupt)?;
                Ok(Some(PlanApplication::try_from(application)?))
            }
            None => Ok(None),
        }
    }

    async fn list_unallocated(
        &self,
        request_id: RequestId,
    ) -> Result<Vec<UnallocatedRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT request_id, product_id, volume_m3, reason, recorded_at
            FROM unallocated_items
            WHERE request_id = $1
            ORDER BY id
            "#,
        )
        .bind(request_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_unallocated", e))?;

        rows.iter()
            .map(|row| {
                Ok(UnallocatedRecord {
                    request_id: RequestId::from_uuid(row.try_get("request_id").map_err(corrupt)?),
                    product_id: row.try_get("product_id").map_err(corrupt)?,
                    volume_m3: row.try_get("volume_m3").map_err(corrupt)?,
                    reason: row.try_get("reason").map_err(corrupt)?,
                    recorded_at: row.try_get("recorded_at").map_err(corrupt)?,
                })
            })
            .collect()
    }

    async fn create_warehouse(&self, total_capacity_m3: f64) -> Result<Warehouse, StoreError> {
        let id: i64 = sqlx::query_scalar("INSERT INTO warehouses (total_capacity) VALUES ($1) RETURNING id")
            .bind(total_capacity_m3)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_warehouse", e))?;

        Ok(Warehouse {
            id: WarehouseId::new(id),
            total_capacity_m3,
        })
    }

    async fn create_product(&self, volume_m3: f64) -> Result<Product, StoreError> {
        let id: i64 = sqlx::query_scalar("INSERT INTO products (volume_m3) VALUES ($1) RETURNING id")
            .bind(volume_m3)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("create_product", e))?;

        Ok(Product {
            id: ProductId::new(id),
            volume_m3,
        })
    }

    #[instrument(skip(self, supply), fields(warehouse_id = %supply.warehouse_id, item_count = supply.items.len()), err)]
    async fn register_supply(&self, supply: NewSupply) -> Result<Supply, StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO supplies (warehouse_id, status, arrival_date, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(supply.warehouse_id.get())
        .bind(SupplyStatus::Received.as_str())
        .bind(supply.arrival_date)
        .bind(&supply.created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_supply", e))?;

        for item in &supply.items {
            sqlx::query("INSERT INTO supply_items (supply_id, product_id, quantity) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(item.product_id.get())
                .bind(item.quantity)
                .execute(&mut *tx)
                .await
                .map_err(|e| map_sqlx_error("insert_supply_item", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(Supply {
            id: SupplyId::new(id),
            warehouse_id: supply.warehouse_id,
            status: SupplyStatus::Received,
            arrival_date: supply.arrival_date,
            created_by: Some(supply.created_by),
            items: supply.items,
        })
    }
}

struct PostgresPlanTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait::async_trait]
impl PlanTransaction for PostgresPlanTransaction {
    #[instrument(skip(self), fields(request_id = %request_id, source_id = %source), err)]
    async fn claim(
        &mut self,
        request_id: RequestId,
        source: WarehouseId,
    ) -> Result<Option<ApplyResult>, StoreError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO plan_applications (request_id, source_warehouse_id)
            VALUES ($1, $2)
            ON CONFLICT (request_id) DO NOTHING
            "#,
        )
        .bind(request_id.as_uuid())
        .bind(source.get())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("claim_request", e))?
        .rows_affected();

        if inserted == 1 {
            return Ok(None);
        }

        let row = sqlx::query(
            "SELECT shipments_created, unallocated_recorded FROM plan_applications WHERE request_id = $1",
        )
        .bind(request_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("load_outcome", e))?;

        match row {
            Some(row) => Ok(Some(ApplyResult {
                shipments_created: to_count(row.try_get("shipments_created").map_err(corrupt)?)?,
                unallocated_recorded: to_count(row.try_get("unallocated_recorded").map_err(corrupt)?)?,
            })),
            None => Err(StoreError::Conflict(format!(
                "request {request_id} claimed concurrently"
            ))),
        }
    }

    async fn missing_warehouses(&mut self, ids: &[WarehouseId]) -> Result<Vec<WarehouseId>, StoreError> {
        let wanted: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM warehouses WHERE id = ANY($1)")
            .bind(&wanted)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("check_warehouses", e))?;

        Ok(ids.iter().copied().filter(|id| !found.contains(&id.get())).collect())
    }

    async fn missing_products(&mut self, ids: &[ProductId]) -> Result<Vec<ProductId>, StoreError> {
        let wanted: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let found: Vec<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ANY($1)")
            .bind(&wanted)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("check_products", e))?;

        Ok(ids.iter().copied().filter(|id| !found.contains(&id.get())).collect())
    }

    async fn insert_shipment(
        &mut self,
        request_id: RequestId,
        source: WarehouseId,
        planned: &PlannedShipment,
        at: DateTime<Utc>,
    ) -> Result<ShipmentId, StoreError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO shipments (
                request_id, source_id, destination_id, status,
                created_by, created_at, last_modified_by, last_modified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $5, $6)
            RETURNING id
            "#,
        )
        .bind(request_id.as_uuid())
        .bind(source.get())
        .bind(planned.destination.get())
        .bind(ShipmentStatus::Planned.as_str())
        .bind(SYSTEM_ACTOR)
        .bind(at)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_shipment", e))?;

        for item in &planned.items {
            sqlx::query("INSERT INTO shipment_items (shipment_id, product_id, quantity) VALUES ($1, $2, $3)")
                .bind(id)
                .bind(item.product_id.get())
                .bind(item.quantity)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("insert_shipment_item", e))?;
        }

        Ok(ShipmentId::new(id))
    }

    async fn mark_supply_processed(
        &mut self,
        supply_id: SupplyId,
        source: WarehouseId,
    ) -> Result<bool, StoreError> {
        let updated = sqlx::query(
            "UPDATE supplies SET status = $2 WHERE id = $1 AND status = $3 AND warehouse_id = $4",
        )
            .bind(supply_id.get())
            .bind(SupplyStatus::Processed.as_str())
            .bind(SupplyStatus::Received.as_str())
            .bind(source.get())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("mark_supply_processed", e))?
            .rows_affected();

        Ok(updated == 1)
    }

    async fn record_unallocated(
        &mut self,
        request_id: RequestId,
        item: &UnallocatedItem,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO unallocated_items (request_id, product_id, volume_m3, reason, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(request_id.as_uuid())
        .bind(&item.product_id)
        .bind(item.volume_m3)
        .bind(&item.reason)
        .bind(at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("record_unallocated", e))?;

        Ok(())
    }

    async fn record_outcome(&mut self, application: &PlanApplication) -> Result<(), StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE plan_applications
            SET supply_id = $2,
                shipments_created = $3,
                unallocated_recorded = $4,
                applied_at = $5
            WHERE request_id = $1
            "#,
        )
        .bind(application.request_id.as_uuid())
        .bind(application.supply_id.map(SupplyId::get))
        .bind(from_count(application.result.shipments_created)?)
        .bind(from_count(application.result.unallocated_recorded)?)
        .bind(application.applied_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("record_outcome", e))?
        .rows_affected();

        if updated != 1 {
            return Err(StoreError::Backend(format!(
                "request {} was not claimed by this transaction",
                application.request_id
            )));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .rollback()
            .await
            .map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn corrupt(err: sqlx::Error) -> StoreError {
    StoreError::Corrupt(err.to_string())
}

fn to_count(value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative count {value}")))
}

fn from_count(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| StoreError::Backend(format!("count {value} out of range")))
}

// SQLx row types

#[derive(Debug)]
struct WarehouseRow {
    id: i64,
    total_capacity: f64,
}

impl<'r> FromRow<'r, PgRow> for WarehouseRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(WarehouseRow {
            id: row.try_get("id")?,
            total_capacity: row.try_get("total_capacity")?,
        })
    }
}

impl From<WarehouseRow> for Warehouse {
    fn from(row: WarehouseRow) -> Self {
        Warehouse {
            id: WarehouseId::new(row.id),
            total_capacity_m3: row.total_capacity,
        }
    }
}

#[derive(Debug)]
struct SupplyRow {
    id: i64,
    warehouse_id: i64,
    status: String,
    arrival_date: Option<DateTime<Utc>>,
    created_by: Option<String>,
}

impl<'r> FromRow<'r, PgRow> for SupplyRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SupplyRow {
            id: row.try_get("id")?,
            warehouse_id: row.try_get("warehouse_id")?,
            status: row.try_get("status")?,
            arrival_date: row.try_get("arrival_date")?,
            created_by: row.try_get("created_by")?,
        })
    }
}

impl SupplyRow {
    fn into_supply(self, items: Vec<SupplyItem>) -> Result<Supply, StoreError> {
        Ok(Supply {
            id: SupplyId::new(self.id),
            warehouse_id: WarehouseId::new(self.warehouse_id),
            status: self
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("supply {}: {}", self.id, e)))?,
            arrival_date: self.arrival_date,
            created_by: self.created_by,
            items,
        })
    }
}

#[derive(Debug)]
struct ShipmentRow {
    id: i64,
    request_id: Option<uuid::Uuid>,
    source_id: i64,
    destination_id: i64,
    status: String,
    created_by: String,
    created_at: DateTime<Utc>,
    last_modified_by: String,
    last_modified_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ShipmentRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ShipmentRow {
            id: row.try_get("id")?,
            request_id: row.try_get("request_id")?,
            source_id: row.try_get("source_id")?,
            destination_id: row.try_get("destination_id")?,
            status: row.try_get("status")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            last_modified_by: row.try_get("last_modified_by")?,
            last_modified_at: row.try_get("last_modified_at")?,
        })
    }
}

impl ShipmentRow {
    fn into_shipment(self, items: Vec<ShipmentItem>) -> Result<Shipment, StoreError> {
        Ok(Shipment {
            id: ShipmentId::new(self.id),
            request_id: self.request_id.map(RequestId::from_uuid),
            source_id: WarehouseId::new(self.source_id),
            destination_id: WarehouseId::new(self.destination_id),
            status: self
                .status
                .parse()
                .map_err(|e| StoreError::Corrupt(format!("shipment {}: {}", self.id, e)))?,
            created_by: self.created_by,
            created_at: self.created_at,
            last_modified_by: self.last_modified_by,
            last_modified_at: self.last_modified_at,
            items,
        })
    }
}

#[derive(Debug)]
struct PlanApplicationRow {
    request_id: uuid::Uuid,
    source_warehouse_id: i64,
    supply_id: Option<i64>,
    shipments_created: i32,
    unallocated_recorded: i32,
    applied_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for PlanApplicationRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PlanApplicationRow {
            request_id: row.try_get("request_id")?,
            source_warehouse_id: row.try_get("source_warehouse_id")?,
            supply_id: row.try_get("supply_id")?,
            shipments_created: row.try_get("shipments_created")?,
            unallocated_recorded: row.try_get("unallocated_recorded")?,
            applied_at: row.try_get("applied_at")?,
        })
    }
}

impl TryFrom<PlanApplicationRow> for PlanApplication {
    type Error = StoreError;

    fn try_from(row: PlanApplicationRow) -> Result<Self, Self::Error> {
        Ok(PlanApplication {
            request_id: RequestId::from_uuid(row.request_id),
            source_warehouse_id: WarehouseId::new(row.source_warehouse_id),
            supply_id: row.supply_id.map(SupplyId::new),
            result: ApplyResult {
                shipments_created: to_count(row.shipments_created)?,
                unallocated_recorded: to_count(row.unallocated_recorded)?,
            },
            applied_at: row.applied_at,
        })
    }
}
