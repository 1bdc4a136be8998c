//! Strongly-typed identifiers used across the domain.
//!
//! Row identifiers are database-assigned integers. The correlation id linking
//! a calculation request to its plan is an opaque UUID.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::DomainError;

/// Identifier of a warehouse row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WarehouseId(i64);

/// Identifier of a product row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(i64);

/// Identifier of a supply (an intake at a source warehouse).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SupplyId(i64);

/// Identifier of a shipment row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShipmentId(i64);

/// Identifier of an authenticated user (actor identity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

macro_rules! impl_row_id {
    ($t:ty, $name:literal) => {
        impl $t {
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i64 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            /// Parse a decimal-string encoded identifier (as carried on the RPC wire).
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s.trim().parse::<i64>().map_err(|e| {
                    DomainError::invalid_argument(format!("{}: '{}': {}", $name, s, e))
                })?;
                Ok(Self(value))
            }
        }
    };
}

impl_row_id!(WarehouseId, "WarehouseId");
impl_row_id!(ProductId, "ProductId");
impl_row_id!(SupplyId, "SupplyId");
impl_row_id!(ShipmentId, "ShipmentId");
impl_row_id!(UserId, "UserId");

/// Correlation id of one calculation request.
///
/// Opaque to everything but the plan-application index: at most one plan may
/// be applied per request id.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generate a fresh, globally-unique request id (random 128-bit token).
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl core::fmt::Display for RequestId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let uuid = Uuid::from_str(s.trim())
            .map_err(|e| DomainError::invalid_argument(format!("RequestId: '{s}': {e}")))?;
        Ok(Self(uuid))
    }
}
