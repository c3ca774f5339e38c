//! # Watcher
//!
//! Bridges store state into the in-process handoff channel. Each cycle:
//!
//! 1. Stop cleanly if the token is cancelled
//! 2. Scan up to `page_size` unprocessed messages (a scan failure is fatal)
//! 3. Hand every message of the page to a consumer, one blocking send at a time
//! 4. Sleep `poll_interval` before the next scan
//!
//! Step 3 is the backpressure mechanism: no further scan starts until the whole
//! page has been taken. A message still unmarked when the next scan runs is
//! delivered again, which is what makes delivery at-least-once.

use crate::config::WatcherConfig;
use crate::error::{ConfigurationError, QueueError};
use crate::handoff::{HandoffError, HandoffSender};
use crate::metrics::QueueMetrics;
use crate::store::MessageStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Polls the store and dispatches unprocessed messages to consumers
pub struct Watcher {
    store: Arc<dyn MessageStore>,
    handoff: HandoffSender,
    config: WatcherConfig,
    metrics: Arc<QueueMetrics>,
}

impl Watcher {
    /// Create a watcher, rejecting a zero page size or poll interval
    pub fn new(
        store: Arc<dyn MessageStore>,
        handoff: HandoffSender,
        config: WatcherConfig,
        metrics: Arc<QueueMetrics>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        Ok(Self::from_validated(store, handoff, config, metrics))
    }

    pub(crate) fn from_validated(
        store: Arc<dyn MessageStore>,
        handoff: HandoffSender,
        config: WatcherConfig,
        metrics: Arc<QueueMetrics>,
    ) -> Self {
        Self {
            store,
            handoff,
            config,
            metrics,
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    /// Run the poll/dispatch loop until `token` is cancelled
    ///
    /// # Errors
    ///
    /// - [`QueueError::Store`] when a scan fails
    /// - [`QueueError::HandoffClosed`] when every consumer receiver has been dropped
    ///
    /// Cancellation, including mid-page, returns `Ok(())`.
    pub async fn run(&self, token: CancellationToken) -> Result<(), QueueError> {
        info!(
            page_size = self.config.page_size,
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "Watcher started"
        );

        let result = self.poll_loop(&token).await;
        match &result {
            Ok(()) => info!("Watcher stopped"),
            Err(e) => error!(error = %e, "Watcher stopped with error"),
        }
        result
    }

    async fn poll_loop(&self, token: &CancellationToken) -> Result<(), QueueError> {
        loop {
            if token.is_cancelled() {
                return Ok(());
            }

            let page = tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                page = self.store.find_unprocessed(self.config.page_size) => page?,
            };
            self.metrics.record_scan();
            debug!(count = page.len(), "Scanned unprocessed messages");

            for message in page {
                let message_id = message.id.clone();
                match self.handoff.send(message, token).await {
                    Ok(()) => {
                        self.metrics.record_dispatched();
                        debug!(message_id = %message_id, "Message dispatched");
                    }
                    Err(HandoffError::Cancelled) => return Ok(()),
                    Err(HandoffError::Closed) => return Err(QueueError::HandoffClosed),
                }
            }

            tokio::select! {
                biased;
                _ = token.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
