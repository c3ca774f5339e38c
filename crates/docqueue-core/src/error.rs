//! Error types for queue operations.

use crate::message::MessageId;
use std::time::Duration;
use thiserror::Error;

/// Comprehensive error type for all queue roles
///
/// Cancellation is never represented here: a cancelled role returns `Ok(())`.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Store operation failed: {0}")]
    Store(#[from] StoreError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Handler failed for message {message_id}: {source}")]
    Handler {
        message_id: MessageId,
        #[source]
        source: HandlerError,
    },

    #[error("Handoff channel closed: no consumer is attached")]
    HandoffClosed,

    #[error("Queue task '{role}' failed: {message}")]
    TaskFailed { role: String, message: String },
}

impl QueueError {
    /// Check if error is transient and the failed role could be restarted
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::Configuration(_) => false,
            Self::Handler { .. } => true, // redelivery will retry the side effect
            Self::HandoffClosed => false,
            Self::TaskFailed { .. } => false,
        }
    }
}

/// Errors reported by a [`MessageStore`](crate::store::MessageStore) implementation
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection to store failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Message with id {id} already exists")]
    DuplicateId { id: MessageId },

    #[error("Document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal store error: {message}")]
    Internal { message: String },
}

impl StoreError {
    /// Check if error is transient and the operation may succeed when repeated
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } => true,
            Self::DuplicateId { .. } => false,
            Self::Serialization(_) => false,
            Self::Io(_) => true,
            Self::Internal { .. } => false,
        }
    }
}

/// Configuration errors, reported at construction time only
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Invalid configuration for {field}: {message}")]
    Invalid { field: String, message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

/// Failure reported by a [`MessageHandler`](crate::handler::MessageHandler)
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{message}")]
    Failed { message: String },
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
        }
    }
}

/// Errors returned while waiting on a readiness signal or bounded await
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReadinessError {
    #[error("Timeout expired after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Readiness signal dropped before it was set")]
    Abandoned,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
