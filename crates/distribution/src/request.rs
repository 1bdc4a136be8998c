use serde::{Deserialize, Serialize};

use stockshift_core::{RequestId, SupplyId, UserId, WarehouseId};

/// The authenticated user on whose behalf a calculation is requested.
///
/// Resolved once at the transport boundary and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initiator {
    pub user_id: UserId,
    pub username: String,
}

impl Initiator {
    pub fn new(user_id: UserId, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }
}

/// Message handed to the planning engine over the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRequest {
    pub request_id: RequestId,
    pub supply_id: SupplyId,
    pub source_warehouse_id: WarehouseId,
    pub initiated_by_user_id: UserId,
    pub initiated_by_username: String,
}

impl CalculationRequest {
    pub fn new(
        request_id: RequestId,
        supply_id: SupplyId,
        source_warehouse_id: WarehouseId,
        initiator: &Initiator,
    ) -> Self {
        Self {
            request_id,
            supply_id,
            source_warehouse_id,
            initiated_by_user_id: initiator.user_id,
            initiated_by_username: initiator.username.clone(),
        }
    }
}
