//! Warehouse capacity accounting.
//!
//! Allocated volume is what applied plans have committed to a destination;
//! pending volume is what received-but-unprocessed supplies still hold at their
//! source. Both reduce free space.

use serde::{Deserialize, Serialize};

use stockshift_core::WarehouseId;

use crate::model::Warehouse;

/// Allocated and pending volume (m³) of one warehouse, as loaded from storage.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeTotals {
    pub allocated: f64,
    pub pending: f64,
}

/// Point-in-time capacity report for one warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacitySnapshot {
    pub warehouse_id: WarehouseId,
    pub total: f64,
    pub allocated: f64,
    pub pending: f64,
    pub free: f64,
    pub utilization_pct: f64,
}

impl CapacitySnapshot {
    pub fn compute(warehouse: &Warehouse, allocated: f64, pending: f64) -> Self {
        let total = warehouse.total_capacity_m3;
        let used = allocated + pending;

        // Overcommitted warehouses report zero free space, never negative.
        let free = (total - used).max(0.0);
        let utilization_pct = if total > 0.0 { used / total * 100.0 } else { 0.0 };

        Self {
            warehouse_id: warehouse.id,
            total,
            allocated,
            pending,
            free,
            utilization_pct,
        }
    }

    pub fn from_totals(warehouse: &Warehouse, totals: VolumeTotals) -> Self {
        Self::compute(warehouse, totals.allocated, totals.pending)
    }

    pub fn is_overcommitted(&self) -> bool {
        self.allocated + self.pending > self.total
    }
}

/// Volume of `quantity` units of a product with the given unit volume.
pub fn line_volume(quantity: i32, unit_volume_m3: f64) -> f64 {
    f64::from(quantity) * unit_volume_m3
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn warehouse(total: f64) -> Warehouse {
        Warehouse {
            id: WarehouseId::new(1),
            total_capacity_m3: total,
        }
    }

    #[test]
    fn overcommitted_warehouse_clamps_free_to_zero() {
        let s = CapacitySnapshot::compute(&warehouse(100.0), 40.0, 70.0);
        assert_eq!(s.free, 0.0);
        assert!((s.utilization_pct - 110.0).abs() < 1e-9);
        assert!(s.is_overcommitted());
    }

    #[test]
    fn zero_capacity_reports_zero_utilization() {
        let s = CapacitySnapshot::compute(&warehouse(0.0), 5.0, 0.0);
        assert_eq!(s.utilization_pct, 0.0);
        assert_eq!(s.free, 0.0);
    }

    #[test]
    fn serializes_camel_case_for_reporting() {
        let s = CapacitySnapshot::compute(&warehouse(200.0), 50.0, 10.0);
        let json = serde_json::to_value(&s).unwrap();

        assert_eq!(json["warehouseId"], 1);
        assert_eq!(json["free"], 140.0);
        assert_eq!(json["utilizationPct"], 30.0);
    }

    #[test]
    fn line_volume_multiplies_quantity_by_unit_volume() {
        assert!((line_volume(3, 0.25) - 0.75).abs() < 1e-12);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn free_is_never_negative_and_accounts_for_used_volume(
            total in 0.0f64..10_000.0,
            allocated in 0.0f64..10_000.0,
            pending in 0.0f64..10_000.0,
        ) {
            let s = CapacitySnapshot::compute(&warehouse(total), allocated, pending);

            prop_assert!(s.free >= 0.0);
            prop_assert!(s.free <= total);
            if allocated + pending <= total {
                prop_assert!((s.free + allocated + pending - total).abs() < 1e-6);
            }
            prop_assert!(s.utilization_pct >= 0.0);
        }
    }
}
