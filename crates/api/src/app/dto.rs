use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockshift_core::{DomainError, DomainResult, ProductId, RequestId, SupplyId, WarehouseId};
use stockshift_distribution::{PlanApplication, SupplyItem, UnallocatedRecord};
use stockshift_infra::NewSupply;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CalculateRequest {
    pub supply_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateWarehouseRequest {
    pub total_capacity_m3: f64,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub volume_m3: f64,
}

#[derive(Debug, Deserialize)]
pub struct SupplyLineRequest {
    pub product_id: i64,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct RegisterSupplyRequest {
    pub warehouse_id: i64,
    #[serde(default)]
    pub arrival_date: Option<DateTime<Utc>>,
    pub items: Vec<SupplyLineRequest>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct CalculationTriggeredResponse {
    pub message: &'static str,
    pub request_id: String,
}

impl CalculationTriggeredResponse {
    pub fn new(request_id: RequestId) -> Self {
        Self {
            message: "calculation triggered",
            request_id: request_id.to_string(),
        }
    }
}

/// Outcome of an applied plan plus whatever it could not place.
#[derive(Debug, Serialize)]
pub struct RequestOutcomeResponse {
    pub request_id: RequestId,
    pub source_warehouse_id: WarehouseId,
    pub supply_id: Option<SupplyId>,
    pub shipments_created: u32,
    pub unallocated_recorded: u32,
    pub applied_at: DateTime<Utc>,
    pub unallocated_items: Vec<UnallocatedRecord>,
}

impl RequestOutcomeResponse {
    pub fn new(application: PlanApplication, unallocated_items: Vec<UnallocatedRecord>) -> Self {
        Self {
            request_id: application.request_id,
            source_warehouse_id: application.source_warehouse_id,
            supply_id: application.supply_id,
            shipments_created: application.result.shipments_created,
            unallocated_recorded: application.result.unallocated_recorded,
            applied_at: application.applied_at,
            unallocated_items,
        }
    }
}

// -------------------------
// Validation
// -------------------------

pub fn supply_id(raw: i64) -> DomainResult<SupplyId> {
    if raw <= 0 {
        return Err(DomainError::invalid_argument(format!(
            "supply_id must be positive, got {raw}"
        )));
    }
    Ok(SupplyId::new(raw))
}

pub fn capacity(raw: f64) -> DomainResult<f64> {
    if !raw.is_finite() || raw < 0.0 {
        return Err(DomainError::invalid_argument(format!(
            "total_capacity_m3 must be a non-negative number, got {raw}"
        )));
    }
    Ok(raw)
}

pub fn unit_volume(raw: f64) -> DomainResult<f64> {
    if !raw.is_finite() || raw <= 0.0 {
        return Err(DomainError::invalid_argument(format!(
            "volume_m3 must be a positive number, got {raw}"
        )));
    }
    Ok(raw)
}

impl RegisterSupplyRequest {
    pub fn into_new_supply(self, created_by: &str) -> DomainResult<NewSupply> {
        if self.warehouse_id <= 0 {
            return Err(DomainError::invalid_argument(format!(
                "warehouse_id must be positive, got {}",
                self.warehouse_id
            )));
        }
        if self.items.is_empty() {
            return Err(DomainError::invalid_argument("supply must have at least one item"));
        }

        let items = self
            .items
            .into_iter()
            .map(|line| {
                if line.quantity <= 0 {
                    return Err(DomainError::invalid_argument(format!(
                        "product {}: quantity must be positive, got {}",
                        line.product_id, line.quantity
                    )));
                }
                Ok(SupplyItem {
                    product_id: ProductId::new(line.product_id),
                    quantity: line.quantity,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(NewSupply {
            warehouse_id: WarehouseId::new(self.warehouse_id),
            arrival_date: self.arrival_date,
            created_by: created_by.to_string(),
            items,
        })
    }
}
