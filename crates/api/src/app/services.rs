//! Infrastructure wiring: storage backend, outbound channel and the saga services.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use stockshift_distribution::CalculationRequest;
use stockshift_events::{InMemoryChannel, MessageChannel, MessageEnvelope};
use stockshift_infra::{
    event_bus::{RedisStreamsChannel, RedisStreamsError},
    CapacityAggregator, DistributionStore, InMemoryDistributionStore, PlanApplicationEngine,
    PlanRequestDispatcher, PostgresDistributionStore, Routing, Settings, StoreError,
};

pub type SharedStore = Arc<dyn DistributionStore>;
pub type SharedChannel = Arc<dyn MessageChannel<MessageEnvelope<CalculationRequest>>>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("storage: {0}")]
    Store(#[from] StoreError),

    #[error("broker: {0}")]
    Channel(#[from] RedisStreamsError),
}

pub struct AppServices {
    pub store: SharedStore,
    pub dispatcher: PlanRequestDispatcher<SharedStore, SharedChannel>,
    pub engine: PlanApplicationEngine<SharedStore>,
    pub capacity: CapacityAggregator<SharedStore>,
}

impl AppServices {
    pub fn new(store: SharedStore, channel: SharedChannel, routing: Routing) -> Self {
        Self {
            dispatcher: PlanRequestDispatcher::new(store.clone(), channel, routing),
            engine: PlanApplicationEngine::new(store.clone()),
            capacity: CapacityAggregator::new(store.clone()),
            store,
        }
    }

    /// In-memory store and channel (dev/tests).
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryDistributionStore::new()),
            Arc::new(InMemoryChannel::new()),
            Routing::default(),
        )
    }
}

/// Select backends from settings: Postgres when `DATABASE_URL` is set, Redis
/// Streams when `REDIS_URL` is set, in-memory otherwise.
pub async fn build_services(settings: &Settings) -> Result<AppServices, BuildError> {
    let store: SharedStore = match &settings.database_url {
        Some(url) => {
            let store =
                PostgresDistributionStore::connect(url, settings.database_max_connections).await?;
            store.init_schema().await?;
            info!("distribution store: postgres");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory distribution store");
            Arc::new(InMemoryDistributionStore::new())
        }
    };

    let channel: SharedChannel = match &settings.redis_url {
        Some(url) => {
            info!(
                stream = %settings.routing.exchange,
                timeout_ms = settings.broker_timeout.as_millis() as u64,
                "calculation requests: redis streams"
            );
            Arc::new(RedisStreamsChannel::new(url)?.with_timeout(settings.broker_timeout))
        }
        None => {
            warn!("REDIS_URL not set; calculation requests stay in process");
            Arc::new(InMemoryChannel::new())
        }
    };

    Ok(AppServices::new(store, channel, settings.routing.clone()))
}
