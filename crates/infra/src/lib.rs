//! Infrastructure layer: storage, broker channels, saga services, config.

pub mod capacity;
pub mod config;
pub mod event_bus;
pub mod plan_application;
pub mod plan_dispatcher;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use capacity::CapacityAggregator;
pub use config::{ConfigError, Settings};
pub use plan_application::PlanApplicationEngine;
pub use plan_dispatcher::{PlanRequestDispatcher, Routing};
pub use store::{
    DistributionStore, InMemoryDistributionStore, NewSupply, PlanTransaction,
    PostgresDistributionStore, StoreError,
};
