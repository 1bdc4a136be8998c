//! In-memory outbound channel for tests/dev.

use std::sync::{mpsc, Mutex};

use crate::bus::{ChannelError, MessageChannel, Subscription};

/// In-memory fan-out channel.
///
/// - No IO / no async
/// - Every subscriber gets a copy of each published message
/// - Can be switched offline to exercise the "broker unavailable" path
#[derive(Debug)]
pub struct InMemoryChannel<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
    published: Mutex<Vec<M>>,
    offline: Mutex<bool>,
}

impl<M> InMemoryChannel<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the broker going down (`true`) or coming back (`false`).
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut flag) = self.offline.lock() {
            *flag = offline;
        }
    }

    pub fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock yields a subscription that never receives.
        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        Subscription::new(rx)
    }
}

impl<M: Clone> InMemoryChannel<M> {
    /// Everything published so far, in publish order.
    pub fn published(&self) -> Vec<M> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl<M> Default for InMemoryChannel<M> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            offline: Mutex::new(false),
        }
    }
}

impl<M> MessageChannel<M> for InMemoryChannel<M>
where
    M: Clone + Send + 'static,
{
    fn publish(&self, message: M) -> Result<(), ChannelError> {
        let offline = self.offline.lock().map(|f| *f).map_err(|_| ChannelError::Closed)?;
        if offline {
            return Err(ChannelError::Connection("in-memory channel is offline".to_string()));
        }

        self.published
            .lock()
            .map_err(|_| ChannelError::Closed)?
            .push(message.clone());

        let mut subs = self.subscribers.lock().map_err(|_| ChannelError::Closed)?;
        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(message.clone()).is_ok());

        Ok(())
    }
}
