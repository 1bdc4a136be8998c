//! Integration tests for the full distribution saga.
//!
//! Tests: Dispatch → Channel → (engine) → ProcessPlan → Store → Capacity
//!
//! Verifies:
//! - Plans are applied exactly once per request id
//! - A plan is applied in full or not at all
//! - Capacity reflects applied plans and pending supplies

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stockshift_core::{DomainError, RequestId, SupplyId, UserId, WarehouseId};
    use stockshift_distribution::{
        CalculationRequest, DistributionPlan, Initiator, Move, Product, ShipmentStatus, Supply,
        SupplyItem, SupplyStatus, UnallocatedItem, Warehouse, SYSTEM_ACTOR,
    };
    use stockshift_events::{ChannelError, InMemoryChannel, MessageChannel, MessageEnvelope};

    use crate::capacity::CapacityAggregator;
    use crate::plan_application::PlanApplicationEngine;
    use crate::plan_dispatcher::{PlanRequestDispatcher, Routing};
    use crate::store::{DistributionStore, InMemoryDistributionStore, NewSupply};

    type Channel = Arc<InMemoryChannel<MessageEnvelope<CalculationRequest>>>;

    struct World {
        store: Arc<InMemoryDistributionStore>,
        hub: Warehouse,
        east: Warehouse,
        west: Warehouse,
        crate_small: Product,
        crate_large: Product,
        supply: Supply,
    }

    async fn world() -> World {
        let store = Arc::new(InMemoryDistributionStore::new());
        let hub = store.create_warehouse(1_000.0).await.unwrap();
        let east = store.create_warehouse(100.0).await.unwrap();
        let west = store.create_warehouse(50.0).await.unwrap();
        let crate_small = store.create_product(0.5).await.unwrap();
        let crate_large = store.create_product(2.0).await.unwrap();
        let supply = store
            .register_supply(NewSupply {
                warehouse_id: hub.id,
                arrival_date: None,
                created_by: "keeper".into(),
                items: vec![
                    SupplyItem { product_id: crate_small.id, quantity: 10 },
                    SupplyItem { product_id: crate_large.id, quantity: 4 },
                ],
            })
            .await
            .unwrap();

        World {
            store,
            hub,
            east,
            west,
            crate_small,
            crate_large,
            supply,
        }
    }

    fn mv(warehouse: &Warehouse, product: &Product, quantity: i32) -> Move {
        Move {
            warehouse_id: warehouse.id.to_string(),
            product_id: product.id.to_string(),
            quantity,
            volume_m3: None,
        }
    }

    fn plan_for(w: &World, request_id: RequestId, moves: Vec<Move>) -> DistributionPlan {
        DistributionPlan {
            request_id: request_id.to_string(),
            source_id: w.hub.id.get(),
            supply_id: w.supply.id.get(),
            moves,
            unallocated_items: vec![],
            generated_at: None,
        }
    }

    fn engine(w: &World) -> PlanApplicationEngine<Arc<InMemoryDistributionStore>> {
        PlanApplicationEngine::new(w.store.clone())
    }

    async fn supply_status(w: &World) -> SupplyStatus {
        w.store.find_supply(w.supply.id).await.unwrap().unwrap().status
    }

    #[tokio::test]
    async fn grouped_moves_become_one_shipment_per_destination() {
        let w = world().await;
        let plan = plan_for(
            &w,
            RequestId::generate(),
            vec![
                mv(&w.east, &w.crate_small, 3),
                mv(&w.east, &w.crate_large, 1),
                mv(&w.west, &w.crate_small, 2),
            ],
        );

        let result = engine(&w).apply(&plan).await.unwrap();
        assert_eq!(result.shipments_created, 2);
        assert_eq!(result.unallocated_recorded, 0);

        let shipments = w.store.list_shipments().await.unwrap();
        assert_eq!(shipments.len(), 2);

        let east = &shipments[0];
        assert_eq!(east.destination_id, w.east.id);
        assert_eq!(east.source_id, w.hub.id);
        assert_eq!(east.status, ShipmentStatus::Planned);
        assert_eq!(east.created_by, SYSTEM_ACTOR);
        assert_eq!(east.last_modified_by, SYSTEM_ACTOR);
        assert_eq!(
            east.items.iter().map(|i| (i.product_id, i.quantity)).collect::<Vec<_>>(),
            vec![(w.crate_small.id, 3), (w.crate_large.id, 1)]
        );

        let west = &shipments[1];
        assert_eq!(west.destination_id, w.west.id);
        assert_eq!(
            west.items.iter().map(|i| (i.product_id, i.quantity)).collect::<Vec<_>>(),
            vec![(w.crate_small.id, 2)]
        );
    }

    #[tokio::test]
    async fn applying_the_same_plan_twice_is_idempotent() {
        let w = world().await;
        let plan = plan_for(
            &w,
            RequestId::generate(),
            vec![mv(&w.east, &w.crate_small, 3), mv(&w.west, &w.crate_large, 1)],
        );

        let first = engine(&w).apply(&plan).await.unwrap();
        let shipments_after_first = w.store.list_shipments().await.unwrap();

        let second = engine(&w).apply(&plan).await.unwrap();
        let shipments_after_second = w.store.list_shipments().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(shipments_after_first, shipments_after_second);
        assert_eq!(supply_status(&w).await, SupplyStatus::Processed);
    }

    #[tokio::test]
    async fn racing_duplicates_apply_once() {
        let w = world().await;
        let plan = plan_for(&w, RequestId::generate(), vec![mv(&w.east, &w.crate_small, 4)]);
        let a = engine(&w);
        let b = engine(&w);

        let (ra, rb) = tokio::join!(a.apply(&plan), b.apply(&plan));

        assert_eq!(ra.unwrap(), rb.unwrap());
        assert_eq!(w.store.list_shipments().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_destination_rolls_back_the_whole_plan() {
        let w = world().await;
        let request_id = RequestId::generate();
        let mut plan = plan_for(&w, request_id, vec![mv(&w.east, &w.crate_small, 3)]);
        plan.moves.push(Move {
            warehouse_id: "9999".into(),
            product_id: w.crate_small.id.to_string(),
            quantity: 1,
            volume_m3: None,
        });
        plan.unallocated_items.push(UnallocatedItem {
            product_id: "X1".into(),
            volume_m3: 1.0,
            reason: "insufficient_capacity".into(),
        });

        let err = engine(&w).apply(&plan).await.unwrap_err();
        match err {
            DomainError::NotFound(msg) => assert!(msg.contains("9999"), "{msg}"),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(w.store.list_shipments().await.unwrap().is_empty());
        assert!(w.store.find_plan_application(request_id).await.unwrap().is_none());
        assert!(w.store.list_unallocated(request_id).await.unwrap().is_empty());
        assert_eq!(supply_status(&w).await, SupplyStatus::Received);
    }

    #[tokio::test]
    async fn unknown_product_is_not_found() {
        let w = world().await;
        let mut plan = plan_for(&w, RequestId::generate(), vec![]);
        plan.moves.push(Move {
            warehouse_id: w.east.id.to_string(),
            product_id: "424242".into(),
            quantity: 1,
            volume_m3: None,
        });

        let err = engine(&w).apply(&plan).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        assert!(w.store.list_shipments().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unset_source_is_rejected_and_persists_nothing() {
        let w = world().await;
        let mut plan = plan_for(&w, RequestId::generate(), vec![mv(&w.east, &w.crate_small, 1)]);
        plan.source_id = 0;

        let err = engine(&w).apply(&plan).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert!(w.store.list_shipments().await.unwrap().is_empty());
        assert_eq!(supply_status(&w).await, SupplyStatus::Received);
    }

    #[tokio::test]
    async fn supply_transitions_once_across_distinct_plans() {
        let w = world().await;

        let first = plan_for(&w, RequestId::generate(), vec![mv(&w.east, &w.crate_small, 5)]);
        engine(&w).apply(&first).await.unwrap();
        assert_eq!(supply_status(&w).await, SupplyStatus::Processed);

        let first_outcome = w
            .store
            .find_plan_application(first.validate().unwrap().request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first_outcome.supply_id, Some(w.supply.id));

        // A second plan for the same supply still creates shipments but does
        // not transition anything.
        let second_id = RequestId::generate();
        let second = plan_for(&w, second_id, vec![mv(&w.west, &w.crate_small, 5)]);
        let result = engine(&w).apply(&second).await.unwrap();
        assert_eq!(result.shipments_created, 1);

        let second_outcome = w.store.find_plan_application(second_id).await.unwrap().unwrap();
        assert_eq!(second_outcome.supply_id, None);
        assert_eq!(supply_status(&w).await, SupplyStatus::Processed);
    }

    #[tokio::test]
    async fn legacy_plan_without_supply_id_falls_back_to_source_reference() {
        let w = world().await;
        let mut plan = plan_for(&w, RequestId::generate(), vec![mv(&w.east, &w.crate_small, 1)]);
        plan.supply_id = 0;

        // The hub's id names no supply, so the transition is skipped without error.
        let result = engine(&w).apply(&plan).await.unwrap();
        assert_eq!(result.shipments_created, 1);
        assert_eq!(supply_status(&w).await, SupplyStatus::Received);
    }

    #[tokio::test]
    async fn supply_held_at_another_warehouse_is_not_transitioned() {
        let w = world().await;
        let west_supply = w
            .store
            .register_supply(NewSupply {
                warehouse_id: w.west.id,
                arrival_date: None,
                created_by: "keeper".into(),
                items: vec![SupplyItem { product_id: w.crate_small.id, quantity: 4 }],
            })
            .await
            .unwrap();

        // Source is the hub, but the supply reference points at west's intake.
        let request_id = RequestId::generate();
        let mut plan = plan_for(&w, request_id, vec![mv(&w.east, &w.crate_small, 2)]);
        plan.supply_id = west_supply.id.get();

        let result = engine(&w).apply(&plan).await.unwrap();
        assert_eq!(result.shipments_created, 1);

        let west_status = w.store.find_supply(west_supply.id).await.unwrap().unwrap().status;
        assert_eq!(west_status, SupplyStatus::Received);
        assert_eq!(supply_status(&w).await, SupplyStatus::Received);

        let outcome = w.store.find_plan_application(request_id).await.unwrap().unwrap();
        assert_eq!(outcome.supply_id, None);

        // West keeps its pending volume: 4 × 0.5 m³.
        let west = CapacityAggregator::new(w.store.clone()).snapshot(w.west.id).await.unwrap();
        assert!((west.pending - 2.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unallocated_items_are_recorded_verbatim() {
        let w = world().await;
        let request_id = RequestId::generate();
        let mut plan = plan_for(&w, request_id, vec![mv(&w.east, &w.crate_small, 1)]);
        plan.unallocated_items = vec![
            UnallocatedItem {
                product_id: "not-a-number".into(),
                volume_m3: 12.5,
                reason: "insufficient_capacity".into(),
            },
            UnallocatedItem {
                product_id: w.crate_large.id.to_string(),
                volume_m3: 2.0,
                reason: "insufficient_capacity".into(),
            },
        ];

        let result = engine(&w).apply(&plan).await.unwrap();
        assert_eq!(result.unallocated_recorded, 2);

        let recorded = w.store.list_unallocated(request_id).await.unwrap();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].product_id, "not-a-number");
        assert_eq!(recorded[0].volume_m3, 12.5);
        assert_eq!(recorded[0].reason, "insufficient_capacity");
    }

    #[tokio::test]
    async fn plan_with_only_unallocated_items_creates_no_shipments() {
        let w = world().await;
        let mut plan = plan_for(&w, RequestId::generate(), vec![]);
        plan.unallocated_items.push(UnallocatedItem {
            product_id: w.crate_large.id.to_string(),
            volume_m3: 8.0,
            reason: "insufficient_capacity".into(),
        });

        let result = engine(&w).apply(&plan).await.unwrap();
        assert_eq!(result.shipments_created, 0);
        assert_eq!(result.unallocated_recorded, 1);
        assert_eq!(supply_status(&w).await, SupplyStatus::Processed);
    }

    #[tokio::test]
    async fn capacity_moves_from_pending_to_allocated_when_a_plan_lands() {
        let w = world().await;
        let capacity = CapacityAggregator::new(w.store.clone());

        let hub_before = capacity.snapshot(w.hub.id).await.unwrap();
        // 10 × 0.5 + 4 × 2.0
        assert_eq!(hub_before.pending, 13.0);
        assert_eq!(hub_before.allocated, 0.0);

        let plan = plan_for(
            &w,
            RequestId::generate(),
            vec![mv(&w.east, &w.crate_small, 10), mv(&w.west, &w.crate_large, 4)],
        );
        engine(&w).apply(&plan).await.unwrap();

        let all = capacity.snapshot_all().await.unwrap();
        assert_eq!(
            all.iter().map(|s| s.warehouse_id).collect::<Vec<_>>(),
            vec![w.hub.id, w.east.id, w.west.id]
        );
        assert_eq!(all[0].pending, 0.0);
        assert_eq!(all[1].allocated, 5.0);
        assert_eq!(all[1].free, 95.0);
        assert_eq!(all[2].allocated, 8.0);
        assert!((all[2].utilization_pct - 16.0).abs() < 1e-9);

        let err = capacity.snapshot(WarehouseId::new(9999)).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn delivered_shipments_release_allocated_volume() {
        let w = world().await;
        let capacity = CapacityAggregator::new(w.store.clone());
        let plan = plan_for(&w, RequestId::generate(), vec![mv(&w.east, &w.crate_large, 5)]);
        engine(&w).apply(&plan).await.unwrap();

        let shipment = w.store.list_shipments().await.unwrap().remove(0);
        assert!(w.store.set_shipment_status(shipment.id, ShipmentStatus::InTransit).await);
        assert_eq!(capacity.snapshot(w.east.id).await.unwrap().allocated, 10.0);

        assert!(w.store.set_shipment_status(shipment.id, ShipmentStatus::Delivered).await);
        assert_eq!(capacity.snapshot(w.east.id).await.unwrap().allocated, 0.0);
    }

    #[tokio::test]
    async fn pending_volume_beyond_capacity_is_reported_as_overcommitted() {
        let w = world().await;
        w.store
            .register_supply(NewSupply {
                warehouse_id: w.west.id,
                arrival_date: None,
                created_by: "keeper".into(),
                items: vec![SupplyItem { product_id: w.crate_large.id, quantity: 30 }],
            })
            .await
            .unwrap();
        let capacity = CapacityAggregator::new(w.store.clone());

        let west = capacity.snapshot(w.west.id).await.unwrap();
        assert_eq!(west.pending, 60.0);
        assert_eq!(west.free, 0.0);
        assert!(west.is_overcommitted());

        let all = capacity.snapshot_all().await.unwrap();
        let overcommitted: Vec<_> = all.iter().filter(|s| s.is_overcommitted()).map(|s| s.warehouse_id).collect();
        assert_eq!(overcommitted, vec![w.west.id]);
    }

    fn dispatcher(w: &World, channel: Channel) -> PlanRequestDispatcher<Arc<InMemoryDistributionStore>, Channel> {
        PlanRequestDispatcher::new(w.store.clone(), channel, Routing::default())
    }

    #[tokio::test]
    async fn dispatch_publishes_exactly_one_request_carrying_the_initiator() {
        let w = world().await;
        let channel: Channel = Arc::new(InMemoryChannel::new());
        let initiator = Initiator::new(UserId::new(77), "olena");

        let request_id = dispatcher(&w, channel.clone())
            .dispatch(w.supply.id, &initiator)
            .await
            .unwrap();

        let published = channel.published();
        assert_eq!(published.len(), 1);

        let envelope = &published[0];
        assert_eq!(envelope.exchange(), "distribution.exchange");
        assert_eq!(envelope.routing_key(), "calculation.request");
        assert_eq!(envelope.message_id(), request_id.to_string());

        let request = envelope.payload();
        assert_eq!(request.request_id, request_id);
        assert_eq!(request.supply_id, w.supply.id);
        assert_eq!(request.source_warehouse_id, w.hub.id);
        assert_eq!(request.initiated_by_user_id, UserId::new(77));
        assert_eq!(request.initiated_by_username, "olena");
    }

    #[tokio::test]
    async fn dispatch_generates_a_fresh_request_id_each_time() {
        let w = world().await;
        let channel: Channel = Arc::new(InMemoryChannel::new());
        let d = dispatcher(&w, channel.clone());
        let initiator = Initiator::new(UserId::new(1), "a");

        let first = d.dispatch(w.supply.id, &initiator).await.unwrap();
        let second = d.dispatch(w.supply.id, &initiator).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(channel.published().len(), 2);
    }

    #[tokio::test]
    async fn dispatch_for_unknown_supply_publishes_nothing() {
        let w = world().await;
        let channel: Channel = Arc::new(InMemoryChannel::new());

        let err = dispatcher(&w, channel.clone())
            .dispatch(SupplyId::new(9999), &Initiator::new(UserId::new(1), "a"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound(_)));
        assert!(channel.published().is_empty());
    }

    #[tokio::test]
    async fn dispatch_with_channel_down_is_unavailable() {
        let w = world().await;
        let channel: Channel = Arc::new(InMemoryChannel::new());
        channel.set_offline(true);

        let err = dispatcher(&w, channel.clone())
            .dispatch(w.supply.id, &Initiator::new(UserId::new(1), "a"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Unavailable(_)));
        assert!(err.is_retryable());
        assert!(channel.published().is_empty());
    }

    /// Blocks each publish until another task opens the gate.
    #[derive(Clone)]
    struct GatedChannel {
        inner: Channel,
        gate: Arc<std::sync::Mutex<std::sync::mpsc::Receiver<()>>>,
    }

    impl MessageChannel<MessageEnvelope<CalculationRequest>> for GatedChannel {
        fn publish(&self, message: MessageEnvelope<CalculationRequest>) -> Result<(), ChannelError> {
            self.gate
                .lock()
                .map_err(|_| ChannelError::Closed)?
                .recv_timeout(std::time::Duration::from_secs(5))
                .map_err(|_| ChannelError::Connection("gate never opened".to_string()))?;
            self.inner.publish(message)
        }
    }

    #[tokio::test]
    async fn blocking_publish_leaves_the_runtime_free_for_other_tasks() {
        // Single-threaded runtime: the gate can only open if the publish runs
        // off the runtime thread.
        let w = world().await;
        let inner: Channel = Arc::new(InMemoryChannel::new());
        let (open, gate) = std::sync::mpsc::channel();
        let channel = GatedChannel {
            inner: inner.clone(),
            gate: Arc::new(std::sync::Mutex::new(gate)),
        };
        let d = PlanRequestDispatcher::new(w.store.clone(), channel, Routing::default());

        let opener = tokio::spawn(async move { open.send(()).unwrap() });
        let request_id = d
            .dispatch(w.supply.id, &Initiator::new(UserId::new(1), "a"))
            .await
            .unwrap();
        opener.await.unwrap();

        let published = inner.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].message_id(), request_id.to_string());
    }

    #[tokio::test]
    async fn full_round_trip_from_dispatch_to_applied_plan() {
        let w = world().await;
        let channel: Channel = Arc::new(InMemoryChannel::new());
        let subscription = channel.subscribe();

        let request_id = dispatcher(&w, channel.clone())
            .dispatch(w.supply.id, &Initiator::new(UserId::new(5), "lena"))
            .await
            .unwrap();

        // Stand-in for the planning engine: consume the request, reply with a plan.
        let envelope = subscription
            .recv_timeout(std::time::Duration::from_secs(1))
            .unwrap();
        let request = envelope.into_payload();
        let plan = DistributionPlan {
            request_id: request.request_id.to_string(),
            source_id: request.source_warehouse_id.get(),
            supply_id: request.supply_id.get(),
            moves: vec![mv(&w.east, &w.crate_small, 10), mv(&w.east, &w.crate_large, 4)],
            unallocated_items: vec![],
            generated_at: Some(1_700_000_000),
        };

        let result = engine(&w).apply(&plan).await.unwrap();
        assert_eq!(result.shipments_created, 1);

        let outcome = w.store.find_plan_application(request_id).await.unwrap().unwrap();
        assert_eq!(outcome.result, result);
        assert_eq!(outcome.source_warehouse_id, w.hub.id);
        assert_eq!(supply_status(&w).await, SupplyStatus::Processed);
    }
}
