//! Producer role: appends new messages to the store.

use crate::error::QueueError;
use crate::message::{Message, MessageId};
use crate::metrics::QueueMetrics;
use crate::store::MessageStore;
use bytes::Bytes;
use std::sync::Arc;
use tracing::{debug, warn};

/// Appends messages to the store
///
/// Each call generates a fresh id, so resending after a failure can never collide
/// with an earlier message. Resending after an ambiguous failure can produce a
/// second logical copy of the same body.
#[derive(Clone)]
pub struct Producer {
    store: Arc<dyn MessageStore>,
    metrics: Arc<QueueMetrics>,
}

impl Producer {
    pub fn new(store: Arc<dyn MessageStore>, metrics: Arc<QueueMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Insert a new unprocessed message with `body`
    ///
    /// # Errors
    ///
    /// Returns the store's insert error unchanged. No retry is attempted.
    pub async fn send(&self, body: impl Into<Bytes>) -> Result<MessageId, QueueError> {
        let message = Message::new(body);

        if let Err(e) = self.store.insert(&message).await {
            warn!(message_id = %message.id, error = %e, "Failed to insert message");
            return Err(e.into());
        }

        self.metrics.record_sent();
        debug!(message_id = %message.id, "Message sent");
        Ok(message.id)
    }
}

#[cfg(test)]
#[path = "producer_tests.rs"]
mod tests;
