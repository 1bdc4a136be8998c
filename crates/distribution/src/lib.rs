//! Distribution domain module.
//!
//! Business rules for warehouse redistribution, implemented as deterministic
//! domain logic (no IO, no HTTP, no storage): the entity model, the calculation
//! request sent to the planning engine, validation and grouping of the plan it
//! returns, and warehouse capacity math.

pub mod capacity;
pub mod model;
pub mod plan;
pub mod request;

pub use capacity::{CapacitySnapshot, VolumeTotals};
pub use model::{
    PlanApplication, Product, Shipment, ShipmentItem, ShipmentStatus, Supply, SupplyItem,
    SupplyStatus, UnallocatedRecord, Warehouse, SYSTEM_ACTOR,
};
pub use plan::{
    ApplyResult, DistributionPlan, Move, PlannedItem, PlannedShipment, UnallocatedItem,
    ValidatedPlan,
};
pub use request::{CalculationRequest, Initiator};
