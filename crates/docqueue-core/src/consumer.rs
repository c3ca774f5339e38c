//! Consumer role: drains the handoff channel and marks messages processed.

use crate::error::QueueError;
use crate::handler::MessageHandler;
use crate::handoff::HandoffReceiver;
use crate::message::Message;
use crate::metrics::QueueMetrics;
use crate::readiness::ReadySignal;
use crate::store::MessageStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Receives dispatched messages, applies the handler, then marks them processed
///
/// Clones share the same handoff receiver, so several consumers can drain one
/// watcher. Each clone gets its own readiness signal.
pub struct Consumer {
    store: Arc<dyn MessageStore>,
    handoff: HandoffReceiver,
    handler: Arc<dyn MessageHandler>,
    metrics: Arc<QueueMetrics>,
    ready: ReadySignal,
}

impl Clone for Consumer {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            handoff: self.handoff.clone(),
            handler: Arc::clone(&self.handler),
            metrics: Arc::clone(&self.metrics),
            ready: ReadySignal::new(),
        }
    }
}

impl Consumer {
    pub fn new(
        store: Arc<dyn MessageStore>,
        handoff: HandoffReceiver,
        handler: Arc<dyn MessageHandler>,
        metrics: Arc<QueueMetrics>,
    ) -> Self {
        Self {
            store,
            handoff,
            handler,
            metrics,
            ready: ReadySignal::new(),
        }
    }

    /// Signal set once [`run`](Self::run) is accepting messages
    pub fn ready(&self) -> ReadySignal {
        self.ready.clone()
    }

    /// Run the receive loop until `token` is cancelled or the watcher goes away
    ///
    /// # Errors
    ///
    /// - [`QueueError::Handler`] when the handler rejects a message
    /// - [`QueueError::Store`] when marking a message processed fails
    ///
    /// Neither is retried here; the message stays unprocessed and will be
    /// redelivered once a consumer runs again.
    pub async fn run(&self, token: CancellationToken) -> Result<(), QueueError> {
        info!("Consumer started");
        self.ready.set();

        let result = self.receive_loop(&token).await;
        match &result {
            Ok(()) => info!("Consumer stopped"),
            Err(e) => error!(error = %e, "Consumer stopped with error"),
        }
        result
    }

    async fn receive_loop(&self, token: &CancellationToken) -> Result<(), QueueError> {
        loop {
            let message = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                next = self.handoff.recv() => match next {
                    Some(message) => message,
                    None => {
                        debug!("Handoff channel closed");
                        return Ok(());
                    }
                },
            };

            self.process(message).await?;
        }
    }

    async fn process(&self, message: Message) -> Result<(), QueueError> {
        self.handler
            .handle(&message)
            .await
            .map_err(|source| QueueError::Handler {
                message_id: message.id.clone(),
                source,
            })?;

        self.store.mark_processed(&message.id).await?;
        self.metrics.record_processed();
        debug!(message_id = %message.id, "Message processed");
        Ok(())
    }
}

#[cfg(test)]
#[path = "consumer_tests.rs"]
mod tests;
