//! Outbound half of the distribution saga.
//!
//! ```text
//! dispatch(supply_id, initiator)
//!   ↓
//! 1. Look up the supply (NotFound if absent)
//!   ↓
//! 2. Mint a fresh request id
//!   ↓
//! 3. Publish one CalculationRequest to the channel (on the blocking pool)
//!   ↓
//! request id (the plan arrives later on the ProcessPlan callback)
//! ```
//!
//! Nothing is persisted here: a failed publish leaves no trace and the caller
//! may simply retry.

use tracing::{info, instrument, warn};

use stockshift_core::{DomainError, DomainResult, RequestId, SupplyId};
use stockshift_distribution::{CalculationRequest, Initiator};
use stockshift_events::{MessageChannel, MessageEnvelope};

use crate::store::DistributionStore;

/// Broker routing for calculation requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Routing {
    pub exchange: String,
    pub routing_key: String,
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            exchange: "distribution.exchange".to_string(),
            routing_key: "calculation.request".to_string(),
        }
    }
}

pub struct PlanRequestDispatcher<S, C> {
    store: S,
    channel: C,
    routing: Routing,
}

impl<S, C> PlanRequestDispatcher<S, C>
where
    S: DistributionStore,
    C: MessageChannel<MessageEnvelope<CalculationRequest>> + Clone + 'static,
{
    pub fn new(store: S, channel: C, routing: Routing) -> Self {
        Self {
            store,
            channel,
            routing,
        }
    }

    /// Request a distribution plan for `supply_id` on behalf of `initiator`.
    ///
    /// Returns as soon as the request is handed to the channel.
    #[instrument(skip(self, initiator), fields(supply_id = %supply_id, username = %initiator.username), err)]
    pub async fn dispatch(&self, supply_id: SupplyId, initiator: &Initiator) -> DomainResult<RequestId> {
        let supply = self
            .store
            .find_supply(supply_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("supply {supply_id}")))?;

        let request_id = RequestId::generate();
        let request = CalculationRequest::new(request_id, supply.id, supply.warehouse_id, initiator);
        let envelope = MessageEnvelope::new(
            self.routing.exchange.clone(),
            self.routing.routing_key.clone(),
            request_id.to_string(),
            request,
        );

        // Channel publishes do synchronous IO.
        let channel = self.channel.clone();
        tokio::task::spawn_blocking(move || channel.publish(envelope))
            .await
            .map_err(|e| DomainError::internal(format!("publish task failed: {e}")))?
            .map_err(|e| {
                warn!(request_id = %request_id, error = %e, "calculation request not published");
                DomainError::unavailable(e.to_string())
            })?;

        info!(
            request_id = %request_id,
            supply_id = %supply.id,
            source_warehouse_id = %supply.warehouse_id,
            username = %initiator.username,
            "calculation request dispatched"
        );

        Ok(request_id)
    }
}
