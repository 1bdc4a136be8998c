use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Envelope for an outbound message: routing metadata plus the payload.
///
/// - `exchange` names the broker destination (topic / stream).
/// - `routing_key` is fixed per message kind and lets consumers bind selectively.
/// - `message_id` is the correlation token consumers echo back, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope<P> {
    exchange: String,
    routing_key: String,
    message_id: String,
    published_at: DateTime<Utc>,
    payload: P,
}

impl<P> MessageEnvelope<P> {
    pub fn new(
        exchange: impl Into<String>,
        routing_key: impl Into<String>,
        message_id: impl Into<String>,
        payload: P,
    ) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            message_id: message_id.into(),
            published_at: Utc::now(),
            payload,
        }
    }

    pub fn exchange(&self) -> &str {
        &self.exchange
    }

    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn into_payload(self) -> P {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_is_stamped_at_construction() {
        let before = Utc::now();
        let envelope = MessageEnvelope::new("distribution.exchange", "calculation.request", "r-1", ());
        let after = Utc::now();

        assert!(envelope.published_at() >= before);
        assert!(envelope.published_at() <= after);
        assert_eq!(envelope.message_id(), "r-1");
    }
}
