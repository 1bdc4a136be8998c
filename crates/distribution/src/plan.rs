//! Computed plans returned by the planning engine.
//!
//! The wire shapes ([`DistributionPlan`], [`Move`], [`UnallocatedItem`]) keep the
//! engine's loose typing (string ids, `0` sentinels). [`DistributionPlan::validate`]
//! turns them into a [`ValidatedPlan`] before anything touches storage.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use stockshift_core::{DomainError, DomainResult, ProductId, RequestId, SupplyId, WarehouseId};

/// A single inventory move as reported by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub warehouse_id: String,
    pub product_id: String,
    pub quantity: i32,
    /// Informational; authoritative volumes come from the product table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_m3: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnallocatedItem {
    pub product_id: String,
    pub volume_m3: f64,
    pub reason: String,
}

/// Plan payload received on the `ProcessPlan` callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionPlan {
    pub request_id: String,
    /// `0` means "unset".
    #[serde(default)]
    pub source_id: i64,
    /// `0`/absent means "not provided"; the source id is used as supply reference.
    #[serde(default)]
    pub supply_id: i64,
    #[serde(default)]
    pub moves: Vec<Move>,
    #[serde(default)]
    pub unallocated_items: Vec<UnallocatedItem>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<i64>,
}

/// Outcome of applying one plan. Stored under the request id and returned
/// verbatim on duplicate applies.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyResult {
    pub shipments_created: u32,
    pub unallocated_recorded: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlannedItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// One shipment to create: a destination and its move lines, in plan order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedShipment {
    pub destination: WarehouseId,
    pub items: Vec<PlannedItem>,
}

/// A plan that passed every check that does not need storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlan {
    pub request_id: RequestId,
    pub source: WarehouseId,
    pub supply_ref: SupplyId,
    pub shipments: Vec<PlannedShipment>,
    pub unallocated: Vec<UnallocatedItem>,
}

impl ValidatedPlan {
    /// Source plus every destination, deduplicated and sorted.
    pub fn warehouse_ids(&self) -> Vec<WarehouseId> {
        let mut ids: BTreeSet<WarehouseId> = self.shipments.iter().map(|s| s.destination).collect();
        ids.insert(self.source);
        ids.into_iter().collect()
    }

    /// Every product referenced by a move, deduplicated and sorted.
    pub fn product_ids(&self) -> Vec<ProductId> {
        self.shipments
            .iter()
            .flat_map(|s| s.items.iter().map(|i| i.product_id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

impl DistributionPlan {
    pub fn validate(&self) -> DomainResult<ValidatedPlan> {
        let raw_id = self.request_id.trim();
        if raw_id.is_empty() {
            return Err(DomainError::invalid_argument("request_id is required"));
        }
        let request_id: RequestId = raw_id.parse()?;

        if self.source_id == 0 {
            return Err(DomainError::invalid_argument(format!(
                "plan {request_id}: source_id is unset"
            )));
        }
        if self.source_id < 0 {
            return Err(DomainError::invalid_argument(format!(
                "plan {request_id}: source_id {} is negative",
                self.source_id
            )));
        }
        if self.supply_id < 0 {
            return Err(DomainError::invalid_argument(format!(
                "plan {request_id}: supply_id {} is negative",
                self.supply_id
            )));
        }

        let source = WarehouseId::new(self.source_id);
        let supply_ref = if self.supply_id > 0 {
            SupplyId::new(self.supply_id)
        } else {
            SupplyId::new(self.source_id)
        };

        Ok(ValidatedPlan {
            request_id,
            source,
            supply_ref,
            shipments: group_moves(&self.moves)?,
            unallocated: self.unallocated_items.clone(),
        })
    }
}

/// Groups moves by destination in order of first appearance.
fn group_moves(moves: &[Move]) -> DomainResult<Vec<PlannedShipment>> {
    let mut shipments: Vec<PlannedShipment> = Vec::new();
    let mut index: HashMap<WarehouseId, usize> = HashMap::new();

    for (line, m) in moves.iter().enumerate() {
        let destination: WarehouseId = m
            .warehouse_id
            .parse()
            .map_err(|e| in_move(line, e))?;
        let product_id: ProductId = m
            .product_id
            .parse()
            .map_err(|e| in_move(line, e))?;
        if m.quantity <= 0 {
            return Err(DomainError::invalid_argument(format!(
                "move {line}: quantity must be positive, got {}",
                m.quantity
            )));
        }

        let item = PlannedItem { product_id, quantity: m.quantity };
        match index.get(&destination) {
            Some(&i) => shipments[i].items.push(item),
            None => {
                index.insert(destination, shipments.len());
                shipments.push(PlannedShipment { destination, items: vec![item] });
            }
        }
    }

    Ok(shipments)
}

fn in_move(line: usize, err: DomainError) -> DomainError {
    match err {
        DomainError::InvalidArgument(msg) => DomainError::invalid_argument(format!("move {line}: {msg}")),
        other => other,
    }
}
