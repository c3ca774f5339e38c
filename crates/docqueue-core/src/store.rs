//! Document store contract consumed by the producer, watcher, and consumer.
//!
//! Any store (document database, relational table, directory of files) can back
//! the queue as long as it provides these operations with the following guarantees:
//! - `insert` is atomic and visible to subsequent scans
//! - `find_unprocessed` returns only documents with `processed == false`, bounded by `limit`
//! - `mark_processed` is idempotent for repeated calls with the same id
//!
//! The queue never assumes transactional isolation beyond what each call provides
//! individually, and it never deletes documents.

use crate::error::StoreError;
use crate::message::{Message, MessageId};
use async_trait::async_trait;

/// Interface implemented by concrete document stores
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a new message
    ///
    /// Must not silently deduplicate: inserting an id that already exists is
    /// reported as [`StoreError::DuplicateId`].
    async fn insert(&self, message: &Message) -> Result<(), StoreError>;

    /// Return up to `limit` messages whose `processed` flag is false
    ///
    /// Order is store-defined and may differ between calls.
    async fn find_unprocessed(&self, limit: usize) -> Result<Vec<Message>, StoreError>;

    /// Set `processed = true` for the message with the given id
    ///
    /// Succeeds without effect when the id is unknown or already processed.
    async fn mark_processed(&self, id: &MessageId) -> Result<(), StoreError>;

    /// Look up a single message by id
    async fn get(&self, id: &MessageId) -> Result<Option<Message>, StoreError>;
}

