//! Common test utilities for docqueue integration tests
//!
//! This module provides:
//! - Handlers that record or reject deliveries
//! - A store wrapper with switchable failures
//! - Queue construction helpers

use async_trait::async_trait;
use docqueue_core::stores::InMemoryStore;
use docqueue_core::{
    DocumentQueue, HandlerError, Message, MessageHandler, MessageId, MessageStore, StoreError,
    WatcherConfig,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[allow(dead_code)]
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Queue over `store` with the default page size and a 1 s poll interval
#[allow(dead_code)]
pub fn queue_over(store: Arc<dyn MessageStore>) -> DocumentQueue {
    DocumentQueue::new(store, WatcherConfig::new(5, POLL_INTERVAL)).unwrap()
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler recording every delivery it sees, in order
#[derive(Default)]
pub struct RecordingHandler {
    deliveries: Mutex<Vec<Message>>,
    reject_first: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reject the first delivery of a message with `body`; later deliveries succeed
    pub fn rejecting_once(body: &str) -> Arc<Self> {
        let handler = Self::default();
        handler.reject_first.lock().unwrap().push(body.to_string());
        Arc::new(handler)
    }

    pub fn bodies(&self) -> Vec<String> {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter_map(|m| m.body_str().map(str::to_string))
            .collect()
    }

    pub fn deliveries_of(&self, id: &MessageId) -> usize {
        self.deliveries
            .lock()
            .unwrap()
            .iter()
            .filter(|m| &m.id == id)
            .count()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait]
impl MessageHandler for RecordingHandler {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        self.deliveries.lock().unwrap().push(message.clone());

        let body = message.body_str().unwrap_or_default();
        let mut reject = self.reject_first.lock().unwrap();
        if let Some(position) = reject.iter().position(|b| b == body) {
            reject.remove(position);
            return Err(HandlerError::failed(format!("rejected {body}")));
        }
        Ok(())
    }
}

// ============================================================================
// Store wrapper
// ============================================================================

/// In-memory store whose scans and marks can be made to fail
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct FaultyStore {
    inner: InMemoryStore,
    fail_scans: Arc<AtomicBool>,
    fail_marks: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &InMemoryStore {
        &self.inner
    }

    pub fn fail_scans(&self, fail: bool) {
        self.fail_scans.store(fail, Ordering::SeqCst);
    }

    pub fn fail_marks(&self, fail: bool) {
        self.fail_marks.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl MessageStore for FaultyStore {
    async fn insert(&self, message: &Message) -> Result<(), StoreError> {
        self.inner.insert(message).await
    }

    async fn find_unprocessed(&self, limit: usize) -> Result<Vec<Message>, StoreError> {
        if self.fail_scans.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionFailed {
                message: "scan refused".to_string(),
            });
        }
        self.inner.find_unprocessed(limit).await
    }

    async fn mark_processed(&self, id: &MessageId) -> Result<(), StoreError> {
        if self.fail_marks.load(Ordering::SeqCst) {
            return Err(StoreError::ConnectionFailed {
                message: "update refused".to_string(),
            });
        }
        self.inner.mark_processed(id).await
    }

    async fn get(&self, id: &MessageId) -> Result<Option<Message>, StoreError> {
        self.inner.get(id).await
    }
}
