//! `stockshift-core`: shared building blocks.
//!
//! Pure primitives only (no infrastructure concerns): the error taxonomy used
//! by every layer and the strongly-typed identifiers of the distribution domain.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{ProductId, RequestId, ShipmentId, SupplyId, UserId, WarehouseId};
