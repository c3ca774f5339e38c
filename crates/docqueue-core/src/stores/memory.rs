//! In-memory document store implementation for testing and development.
//!
//! This store keeps every message in insertion order and scans them front to
//! back, which makes delivery order deterministic for tests. It provides:
//! - Duplicate id rejection on insert
//! - Idempotent `mark_processed`
//! - Thread-safe concurrent access
//!
//! This store is intended for:
//! - Unit testing of queue roles
//! - Development and prototyping
//! - Reference behavior for persistent stores

use crate::error::StoreError;
use crate::message::{Message, MessageId};
use crate::store::MessageStore;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

// ============================================================================
// Internal Storage Structures
// ============================================================================

/// Documents in insertion order plus an id index into that order
#[derive(Default)]
struct DocumentStorage {
    documents: Vec<Message>,
    index: HashMap<MessageId, usize>,
}

impl DocumentStorage {
    fn unprocessed(&self, limit: usize) -> Vec<Message> {
        self.documents
            .iter()
            .filter(|m| !m.processed)
            .take(limit)
            .cloned()
            .collect()
    }
}

// ============================================================================
// InMemoryStore
// ============================================================================

/// In-memory message store
///
/// Cloning the store shares the underlying documents.
///
/// # Examples
///
/// ```
/// use docqueue_core::stores::InMemoryStore;
/// use docqueue_core::{Message, MessageStore};
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// let message = Message::new("hello");
/// store.insert(&message).await?;
///
/// let view = store.clone();
/// store.mark_processed(&message.id).await?;
/// assert!(view.find_unprocessed(10).await?.is_empty());
/// # Ok::<(), docqueue_core::StoreError>(())
/// # }).unwrap();
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStore {
    storage: Arc<RwLock<DocumentStorage>>,
}

impl InMemoryStore {
    /// Create a new, empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held, processed or not
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.documents.len())
    }

    /// Check if the store holds no documents
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.documents.is_empty())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, DocumentStorage>, StoreError> {
        self.storage.read().map_err(|_| StoreError::Internal {
            message: "in-memory store lock poisoned".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, DocumentStorage>, StoreError> {
        self.storage.write().map_err(|_| StoreError::Internal {
            message: "in-memory store lock poisoned".to_string(),
        })
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn insert(&self, message: &Message) -> Result<(), StoreError> {
        let mut storage = self.write()?;

        if storage.index.contains_key(&message.id) {
            return Err(StoreError::DuplicateId {
                id: message.id.clone(),
            });
        }

        let position = storage.documents.len();
        storage.index.insert(message.id.clone(), position);
        storage.documents.push(message.clone());
        Ok(())
    }

    async fn find_unprocessed(&self, limit: usize) -> Result<Vec<Message>, StoreError> {
        Ok(self.read()?.unprocessed(limit))
    }

    async fn mark_processed(&self, id: &MessageId) -> Result<(), StoreError> {
        let mut storage = self.write()?;

        if let Some(&position) = storage.index.get(id) {
            storage.documents[position].processed = true;
        }
        Ok(())
    }

    async fn get(&self, id: &MessageId) -> Result<Option<Message>, StoreError> {
        let storage = self.read()?;
        Ok(storage
            .index
            .get(id)
            .map(|&position| storage.documents[position].clone()))
    }
}
