//! Inbound half of the distribution saga: applying a computed plan.
//!
//! ```text
//! apply(plan)
//!   ↓
//! 1. Validate + group moves (pure; nothing touched on failure)
//!   ↓
//! 2. Begin transaction
//!   ↓
//! 3. Claim request id (already applied → roll back, return stored result)
//!   ↓
//! 4. Check source, destinations and products exist (NotFound → roll back)
//!   ↓
//! 5. Insert one PLANNED shipment per destination
//!   ↓
//! 6. RECEIVED → PROCESSED for the referenced supply, if held at the source
//!   ↓
//! 7. Record unallocated remainders
//!   ↓
//! 8. Record outcome, commit
//! ```
//!
//! Any error after step 2 drops the transaction, so a plan is applied in
//! full or not at all.

use chrono::Utc;
use tracing::{info, instrument, warn, Span};

use stockshift_core::{DomainError, DomainResult, ProductId, WarehouseId};
use stockshift_distribution::{ApplyResult, DistributionPlan, PlanApplication, ValidatedPlan};

use crate::store::{DistributionStore, PlanTransaction};

pub struct PlanApplicationEngine<S> {
    store: S,
}

impl<S> PlanApplicationEngine<S>
where
    S: DistributionStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[instrument(
        skip(self, plan),
        fields(
            request_id = %plan.request_id,
            source_id = plan.source_id,
            move_count = plan.moves.len(),
            duplicate = tracing::field::Empty
        ),
        err
    )]
    pub async fn apply(&self, plan: &DistributionPlan) -> DomainResult<ApplyResult> {
        let validated = plan.validate()?;

        let mut tx = self.store.begin().await?;

        if let Some(existing) = tx.claim(validated.request_id, validated.source).await? {
            tx.rollback().await?;
            Span::current().record("duplicate", true);
            info!(
                request_id = %validated.request_id,
                shipments_created = existing.shipments_created,
                "plan already applied; returning recorded outcome"
            );
            return Ok(existing);
        }

        let outcome = match materialize(tx.as_mut(), &validated).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // Best effort; dropping the transaction rolls back as well.
                let _ = tx.rollback().await;
                return Err(e);
            }
        };

        tx.commit().await?;

        info!(
            request_id = %validated.request_id,
            shipments_created = outcome.result.shipments_created,
            unallocated_recorded = outcome.result.unallocated_recorded,
            supply_processed = outcome.supply_id.is_some(),
            "plan applied"
        );

        Ok(outcome.result)
    }
}

/// Steps 4-8, all inside `tx`.
async fn materialize(
    tx: &mut dyn PlanTransaction,
    plan: &ValidatedPlan,
) -> DomainResult<PlanApplication> {
    let missing_warehouses = tx.missing_warehouses(&plan.warehouse_ids()).await?;
    let missing_products = tx.missing_products(&plan.product_ids()).await?;
    if !missing_warehouses.is_empty() || !missing_products.is_empty() {
        return Err(DomainError::not_found(describe_missing(
            &missing_warehouses,
            &missing_products,
        )));
    }

    let now = Utc::now();

    for shipment in &plan.shipments {
        tx.insert_shipment(plan.request_id, plan.source, shipment, now).await?;
    }

    let supply_id = if tx.mark_supply_processed(plan.supply_ref, plan.source).await? {
        Some(plan.supply_ref)
    } else {
        info!(
            request_id = %plan.request_id,
            supply_id = %plan.supply_ref,
            source_id = %plan.source,
            "supply absent, already processed or not held at source; no status change"
        );
        None
    };

    if !plan.unallocated.is_empty() {
        let volume: f64 = plan.unallocated.iter().map(|u| u.volume_m3).sum();
        warn!(
            request_id = %plan.request_id,
            count = plan.unallocated.len(),
            volume_m3 = volume,
            "plan left items unallocated"
        );
    }
    for item in &plan.unallocated {
        tx.record_unallocated(plan.request_id, item, now).await?;
    }

    let application = PlanApplication {
        request_id: plan.request_id,
        source_warehouse_id: plan.source,
        supply_id,
        result: ApplyResult {
            shipments_created: count(plan.shipments.len())?,
            unallocated_recorded: count(plan.unallocated.len())?,
        },
        applied_at: now,
    };
    tx.record_outcome(&application).await?;

    Ok(application)
}

fn describe_missing(
    warehouses: &[WarehouseId],
    products: &[ProductId],
) -> String {
    let join = |ids: Vec<String>| ids.join(", ");
    match (warehouses.is_empty(), products.is_empty()) {
        (false, true) => format!(
            "warehouses [{}]",
            join(warehouses.iter().map(ToString::to_string).collect())
        ),
        (true, false) => format!(
            "products [{}]",
            join(products.iter().map(ToString::to_string).collect())
        ),
        _ => format!(
            "warehouses [{}], products [{}]",
            join(warehouses.iter().map(ToString::to_string).collect()),
            join(products.iter().map(ToString::to_string).collect())
        ),
    }
}

fn count(n: usize) -> DomainResult<u32> {
    u32::try_from(n).map_err(|_| DomainError::invalid_argument(format!("plan too large: {n} entries")))
}
