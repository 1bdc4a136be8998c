//! Entity model (relational rows as seen by the distribution core).

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockshift_core::{DomainError, ProductId, RequestId, ShipmentId, SupplyId, WarehouseId};

use crate::plan::ApplyResult;

/// Actor recorded on rows written by plan application.
pub const SYSTEM_ACTOR: &str = "system_algo";

/// A storage facility with a fixed total capacity (m³).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    pub total_capacity_m3: f64,
}

/// A product with its unit volume (m³).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub volume_m3: f64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplyStatus {
    /// Arrived at the source hub; its items count as pending volume.
    Received,
    /// Distributed by an applied plan. Terminal.
    Processed,
}

impl SupplyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SupplyStatus::Received => "RECEIVED",
            SupplyStatus::Processed => "PROCESSED",
        }
    }
}

impl FromStr for SupplyStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RECEIVED" => Ok(SupplyStatus::Received),
            "PROCESSED" => Ok(SupplyStatus::Processed),
            other => Err(DomainError::internal(format!("unknown supply status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplyItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Stock that physically arrived at a source warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Supply {
    pub id: SupplyId,
    pub warehouse_id: WarehouseId,
    pub status: SupplyStatus,
    pub arrival_date: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub items: Vec<SupplyItem>,
}

impl Supply {
    pub fn is_pending(&self) -> bool {
        self.status == SupplyStatus::Received
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    /// Reserved by an applied plan.
    Planned,
    /// Physically moving.
    InTransit,
    /// Arrived; reconciled into the destination's stock elsewhere.
    Delivered,
}

impl ShipmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::Planned => "PLANNED",
            ShipmentStatus::InTransit => "IN_TRANSIT",
            ShipmentStatus::Delivered => "DELIVERED",
        }
    }

    /// Whether the shipment's volume still counts against the destination.
    pub fn counts_as_allocated(self) -> bool {
        matches!(self, ShipmentStatus::Planned | ShipmentStatus::InTransit)
    }
}

impl FromStr for ShipmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PLANNED" => Ok(ShipmentStatus::Planned),
            "IN_TRANSIT" => Ok(ShipmentStatus::InTransit),
            "DELIVERED" => Ok(ShipmentStatus::Delivered),
            other => Err(DomainError::internal(format!("unknown shipment status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    /// Correlation id of the plan that created this shipment.
    pub request_id: Option<RequestId>,
    pub source_id: WarehouseId,
    pub destination_id: WarehouseId,
    pub status: ShipmentStatus,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub last_modified_by: String,
    pub last_modified_at: DateTime<Utc>,
    pub items: Vec<ShipmentItem>,
}

/// A plan remainder the engine could not place, kept for operator visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnallocatedRecord {
    pub request_id: RequestId,
    /// Opaque product reference, exactly as reported by the planning engine.
    pub product_id: String,
    pub volume_m3: f64,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

/// Durable outcome of one applied plan, keyed by its correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanApplication {
    pub request_id: RequestId,
    pub source_warehouse_id: WarehouseId,
    /// Supply transitioned to PROCESSED by this application, if any.
    pub supply_id: Option<SupplyId>,
    pub result: ApplyResult,
    pub applied_at: DateTime<Utc>,
}
