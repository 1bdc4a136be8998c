//! Broker-backed outbound channels.
//!
//! The channel abstraction lives in `stockshift-events`; this module provides
//! infrastructure-backed implementations (e.g. Redis).

#[cfg(feature = "redis")]
pub mod redis_streams;

#[cfg(feature = "redis")]
pub use redis_streams::{RedisStreamsChannel, RedisStreamsError};
