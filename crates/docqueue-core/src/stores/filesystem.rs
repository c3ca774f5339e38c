//! # Filesystem Message Store
//!
//! Local filesystem implementation of [`MessageStore`] for development and
//! single-host deployments. Every message is one JSON document named after its id:
//!
//! ```text
//! {base_path}/messages/{message_id}.json
//! ```
//!
//! Writes go to a temporary file first and are then linked or renamed into place,
//! so a scan never observes a partially written document.

use crate::error::StoreError;
use crate::message::{Message, MessageId};
use crate::store::MessageStore;
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

#[cfg(test)]
#[path = "filesystem_tests.rs"]
mod tests;

const MESSAGES_DIR: &str = "messages";
const DOCUMENT_EXTENSION: &str = "json";

/// Filesystem-backed message store
///
/// # Examples
///
/// ```no_run
/// use docqueue_core::stores::FilesystemStore;
/// use std::path::PathBuf;
/// # async fn example() -> Result<(), docqueue_core::StoreError> {
/// let store = FilesystemStore::new(PathBuf::from("./data/queue")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FilesystemStore {
    messages_path: PathBuf,
}

impl FilesystemStore {
    /// Create a store rooted at `base_path`, creating the directory layout if needed
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created or accessed.
    pub async fn new(base_path: PathBuf) -> Result<Self, StoreError> {
        let messages_path = base_path.join(MESSAGES_DIR);
        fs::create_dir_all(&messages_path).await?;

        Ok(Self { messages_path })
    }

    /// Directory holding the message documents
    pub fn messages_path(&self) -> &Path {
        &self.messages_path
    }

    fn document_path(&self, id: &MessageId) -> PathBuf {
        self.messages_path
            .join(format!("{}.{}", id.as_str(), DOCUMENT_EXTENSION))
    }

    fn temp_path(&self, id: &MessageId) -> PathBuf {
        // Leading dot and a unique suffix keep concurrent writers apart and out of scans
        self.messages_path
            .join(format!(".{}.{}.tmp", id.as_str(), uuid::Uuid::new_v4()))
    }

    async fn write_temp(&self, message: &Message) -> Result<PathBuf, StoreError> {
        let json = serde_json::to_vec_pretty(message)?;
        let temp_path = self.temp_path(&message.id);

        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(&json).await?;
        file.sync_all().await?;

        Ok(temp_path)
    }

    async fn read_document(&self, path: &Path) -> Result<Option<Message>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_document(path: &Path) -> bool {
    let visible = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| !name.starts_with('.'));

    visible && path.extension().and_then(|ext| ext.to_str()) == Some(DOCUMENT_EXTENSION)
}

#[async_trait]
impl MessageStore for FilesystemStore {
    async fn insert(&self, message: &Message) -> Result<(), StoreError> {
        let temp_path = self.write_temp(message).await?;
        let document_path = self.document_path(&message.id);

        // hard_link fails if the target exists, which gives create-if-absent semantics
        let linked = fs::hard_link(&temp_path, &document_path).await;
        fs::remove_file(&temp_path).await?;

        match linked {
            Ok(()) => {
                debug!(message_id = %message.id, path = %document_path.display(), "Stored message document");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(StoreError::DuplicateId {
                id: message.id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_unprocessed(&self, limit: usize) -> Result<Vec<Message>, StoreError> {
        let mut entries = fs::read_dir(&self.messages_path).await?;
        let mut pending = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_document(&path) {
                continue;
            }

            // A document can only disappear through external cleanup; skip it if so
            if let Some(message) = self.read_document(&path).await? {
                if !message.processed {
                    pending.push(message);
                }
            }
        }

        pending.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        pending.truncate(limit);

        Ok(pending)
    }

    async fn mark_processed(&self, id: &MessageId) -> Result<(), StoreError> {
        let document_path = self.document_path(id);

        let message = match self.read_document(&document_path).await? {
            Some(message) if !message.processed => message,
            _ => return Ok(()),
        };

        let temp_path = self.write_temp(&message.into_processed()).await?;
        fs::rename(&temp_path, &document_path).await?;

        debug!(message_id = %id, "Marked message document processed");
        Ok(())
    }

    async fn get(&self, id: &MessageId) -> Result<Option<Message>, StoreError> {
        self.read_document(&self.document_path(id)).await
    }
}
