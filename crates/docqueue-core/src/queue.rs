//! Wiring for one queue: store, handoff channel, shared metrics.

use crate::config::WatcherConfig;
use crate::consumer::Consumer;
use crate::error::ConfigurationError;
use crate::handler::MessageHandler;
use crate::handoff::{self, HandoffReceiver, HandoffSender};
use crate::metrics::{MetricsSnapshot, QueueMetrics};
use crate::producer::Producer;
use crate::store::MessageStore;
use crate::watcher::Watcher;
use std::sync::Arc;

/// A polling queue over a single store
///
/// Hands out producers, a watcher, and consumers that are all connected to the
/// same handoff channel and metrics.
///
/// # Examples
///
/// ```
/// use docqueue_core::{DocumentQueue, LoggingHandler, Supervisor, WatcherConfig};
/// use docqueue_core::stores::InMemoryStore;
/// use std::sync::Arc;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let queue = DocumentQueue::new(Arc::new(InMemoryStore::new()), WatcherConfig::default())?;
/// queue.producer().send("hello").await?;
///
/// let mut supervisor = Supervisor::new();
/// supervisor.spawn_watcher(queue.watcher());
/// supervisor.spawn_consumer("consumer-0", queue.consumer(Arc::new(LoggingHandler)));
/// supervisor.shutdown();
/// supervisor.wait().await?;
/// # Ok(())
/// # }
/// ```
pub struct DocumentQueue {
    store: Arc<dyn MessageStore>,
    config: WatcherConfig,
    sender: HandoffSender,
    receiver: HandoffReceiver,
    metrics: Arc<QueueMetrics>,
}

impl DocumentQueue {
    /// Create a queue, validating the watcher configuration up front
    pub fn new(
        store: Arc<dyn MessageStore>,
        config: WatcherConfig,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;
        let (sender, receiver) = handoff::channel();

        Ok(Self {
            store,
            config,
            sender,
            receiver,
            metrics: Arc::new(QueueMetrics::new()),
        })
    }

    pub fn store(&self) -> Arc<dyn MessageStore> {
        Arc::clone(&self.store)
    }

    pub fn producer(&self) -> Producer {
        Producer::new(self.store(), Arc::clone(&self.metrics))
    }

    pub fn watcher(&self) -> Watcher {
        // Config was validated in `new`
        Watcher::from_validated(
            self.store(),
            self.sender.clone(),
            self.config.clone(),
            Arc::clone(&self.metrics),
        )
    }

    pub fn consumer(&self, handler: Arc<dyn MessageHandler>) -> Consumer {
        Consumer::new(
            self.store(),
            self.receiver.clone(),
            handler,
            Arc::clone(&self.metrics),
        )
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
