//! Side effects applied by consumers before a message is marked processed.
//!
//! Delivery is at-least-once, so handlers must tolerate seeing the same message
//! more than once.

use crate::error::HandlerError;
use crate::message::Message;
use async_trait::async_trait;
use tracing::info;

/// Work performed for each delivered message
#[async_trait]
pub trait MessageHandler: Send + Sync {
    /// Apply the side effect for `message`
    ///
    /// Returning an error stops the consumer before the message is marked, so the
    /// message stays eligible for redelivery.
    async fn handle(&self, message: &Message) -> Result<(), HandlerError>;
}

/// Handler that logs each message body
#[derive(Debug, Clone, Default)]
pub struct LoggingHandler;

#[async_trait]
impl MessageHandler for LoggingHandler {
    async fn handle(&self, message: &Message) -> Result<(), HandlerError> {
        match message.body_str() {
            Some(body) => info!(message_id = %message.id, body = body, "Entry found"),
            None => info!(
                message_id = %message.id,
                body_len = message.body.len(),
                "Entry found (binary body)"
            ),
        }
        Ok(())
    }
}
