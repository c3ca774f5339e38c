//! # docqueue core
//!
//! Durable, at-least-once work queue layered on a generic document store.
//!
//! Producers append messages to the store, a watcher polls the store for
//! unprocessed messages and hands each one over a zero-capacity channel, and one
//! or more consumers apply a side effect and mark the message processed.
//!
//! This library provides:
//! - A store-agnostic [`MessageStore`] contract with in-memory and filesystem stores
//! - Producer, watcher, and consumer roles sharing one cancellation token
//! - Backpressure through blocking handoff: no rescans while a page is untaken
//! - A [`Supervisor`] applying first-error-wins shutdown across roles
//! - One-shot readiness signals
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all queue operations
//! - [`message`] - Message document and identifiers
//! - [`store`] - Store contract
//! - [`stores`] - Store implementations
//! - [`producer`], [`watcher`], [`consumer`] - Queue roles
//! - [`supervisor`] - Concurrent role lifecycle

// Module declarations
pub mod config;
pub mod consumer;
pub mod error;
pub mod handler;
pub mod handoff;
pub mod message;
pub mod metrics;
pub mod producer;
pub mod queue;
pub mod readiness;
pub mod store;
pub mod stores;
pub mod supervisor;
pub mod watcher;

// Re-export commonly used types at crate root for convenience
pub use config::{WatcherConfig, DEFAULT_PAGE_SIZE, DEFAULT_POLL_INTERVAL};
pub use consumer::Consumer;
pub use error::{ConfigurationError, HandlerError, QueueError, ReadinessError, StoreError};
pub use handler::{LoggingHandler, MessageHandler};
pub use message::{Message, MessageId, Timestamp};
pub use metrics::{MetricsSnapshot, QueueMetrics};
pub use producer::Producer;
pub use queue::DocumentQueue;
pub use readiness::ReadySignal;
pub use store::MessageStore;
pub use supervisor::{RoleName, Supervisor};
pub use tokio_util::sync::CancellationToken;
pub use watcher::Watcher;

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
