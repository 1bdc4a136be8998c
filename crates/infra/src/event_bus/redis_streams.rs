//! Redis Streams-backed outbound channel (durable, at-least-once delivery).
//!
//! - **Stream Key**: the envelope's exchange name (e.g. `distribution.exchange`)
//! - **Entry fields**: `routing_key`, `request_id` (the envelope's message id),
//!   `published_at` (RFC 3339) and `payload` (JSON-encoded payload)
//! - **Timeouts**: connect, read and write are each bounded by the channel's
//!   timeout, so an unreachable broker fails the publish instead of hanging it
//! - **Consumers**: the planning engine reads the stream through its own
//!   consumer group; this service only appends.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::instrument;

use stockshift_events::{ChannelError, MessageChannel, MessageEnvelope};

/// Approximate cap on stream length (`XADD MAXLEN ~`).
const MAX_LEN: usize = 100_000;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RedisStreamsChannel {
    client: Arc<redis::Client>,
    timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum RedisStreamsError {
    #[error("Redis connection error: {0}")]
    Connection(String),

    #[error("Redis command error: {0}")]
    Command(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<RedisStreamsError> for ChannelError {
    fn from(value: RedisStreamsError) -> Self {
        match value {
            RedisStreamsError::Connection(msg) => ChannelError::Connection(msg),
            RedisStreamsError::Command(msg) => ChannelError::Rejected(msg),
            RedisStreamsError::Serialization(msg) => ChannelError::Serialization(msg),
        }
    }
}

impl RedisStreamsChannel {
    /// Create a channel for `redis_url` (e.g. "redis://localhost:6379").
    ///
    /// Only validates the URL; connections are opened per publish.
    pub fn new(redis_url: impl AsRef<str>) -> Result<Self, RedisStreamsError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))?;

        Ok(Self {
            client: Arc::new(client),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Bound on connect, read and write for each publish.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[instrument(
        skip(self, message),
        fields(
            stream_key = %message.exchange(),
            routing_key = %message.routing_key(),
            request_id = %message.message_id()
        ),
        err
    )]
    fn publish_sync<P: Serialize>(&self, message: &MessageEnvelope<P>) -> Result<String, RedisStreamsError> {
        let payload = serde_json::to_string(message.payload())
            .map_err(|e| RedisStreamsError::Serialization(e.to_string()))?;

        let mut conn = self
            .client
            .get_connection_with_timeout(self.timeout)
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))?;
        conn.set_read_timeout(Some(self.timeout))
            .and_then(|_| conn.set_write_timeout(Some(self.timeout)))
            .map_err(|e| RedisStreamsError::Connection(e.to_string()))?;

        let entry_id: String = redis::cmd("XADD")
            .arg(message.exchange())
            .arg("MAXLEN")
            .arg("~")
            .arg(MAX_LEN)
            .arg("*") // Auto-generate entry ID
            .arg("routing_key")
            .arg(message.routing_key())
            .arg("request_id")
            .arg(message.message_id())
            .arg("published_at")
            .arg(message.published_at().to_rfc3339())
            .arg("payload")
            .arg(&payload)
            .query(&mut conn)
            .map_err(|e| RedisStreamsError::Command(format!("XADD failed: {}", e)))?;

        Ok(entry_id)
    }
}

impl<P> MessageChannel<MessageEnvelope<P>> for RedisStreamsChannel
where
    P: Serialize + Send + 'static,
{
    fn publish(&self, message: MessageEnvelope<P>) -> Result<(), ChannelError> {
        self.publish_sync(&message)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_url_is_a_connection_error() {
        let err = RedisStreamsChannel::new("not a url").unwrap_err();
        assert!(matches!(err, RedisStreamsError::Connection(_)));
    }

    #[test]
    fn unreachable_broker_surfaces_as_channel_connection_error() {
        // Nothing listens on port 1.
        let channel = RedisStreamsChannel::new("redis://127.0.0.1:1")
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        let err = channel
            .publish(MessageEnvelope::new("distribution.exchange", "calculation.request", "r-1", 42u32))
            .unwrap_err();
        assert!(matches!(err, ChannelError::Connection(_)));
    }

    #[test]
    fn publish_to_a_silent_host_gives_up_after_the_timeout() {
        // Non-routable address: the connect attempt never completes on its own.
        let channel = RedisStreamsChannel::new("redis://10.255.255.1:6379")
            .unwrap()
            .with_timeout(Duration::from_millis(300));

        let started = std::time::Instant::now();
        let err = channel
            .publish(MessageEnvelope::new("distribution.exchange", "calculation.request", "r-2", 7u32))
            .unwrap_err();

        assert!(matches!(err, ChannelError::Connection(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
