//! `stockshift-events`: outbound messaging mechanics.
//!
//! Transport-agnostic publish abstraction plus an in-memory channel for
//! tests/dev. Broker-backed channels live in `stockshift-infra`.

pub mod bus;
pub mod envelope;
pub mod in_memory_bus;

pub use bus::{ChannelError, MessageChannel, Subscription};
pub use envelope::MessageEnvelope;
pub use in_memory_bus::InMemoryChannel;
