//! Outbound message channel abstraction (mechanics only).
//!
//! A channel is the hand-off point between this service and a message broker.
//! It is deliberately fire-and-forget:
//!
//! - **One publish per call**: callers publish exactly once and do not wait for
//!   any consumer to act on the message.
//! - **No local state**: nothing is recorded pending acknowledgment, so a failed
//!   publish leaves nothing half-done; the caller surfaces a retryable error.
//! - **At-least-once downstream**: consumers on the far side of the broker must
//!   tolerate redelivery.

use std::sync::mpsc::Receiver;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// A subscription to messages published on an in-process channel.
///
/// Broker-backed channels do not hand out subscriptions; consumers attach to
/// the broker directly.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a message without blocking.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Publish failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The broker could not be reached.
    #[error("channel connection failed: {0}")]
    Connection(String),

    /// The broker rejected the publish command.
    #[error("channel publish rejected: {0}")]
    Rejected(String),

    /// The message could not be encoded.
    #[error("message serialization failed: {0}")]
    Serialization(String),

    /// The channel has been shut down.
    #[error("channel closed")]
    Closed,
}

/// Outbound channel contract.
///
/// Implementations must be `Send + Sync`: publishes may come from any request
/// handler concurrently.
pub trait MessageChannel<M>: Send + Sync {
    fn publish(&self, message: M) -> Result<(), ChannelError>;
}

impl<M, C> MessageChannel<M> for Arc<C>
where
    C: MessageChannel<M> + ?Sized,
{
    fn publish(&self, message: M) -> Result<(), ChannelError> {
        (**self).publish(message)
    }
}
