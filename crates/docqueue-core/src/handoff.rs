//! Zero-capacity handoff channel between the watcher and its consumers.
//!
//! A send completes only once a consumer has taken the message, so a watcher with
//! nobody draining the channel stalls on the current message instead of buffering.
//! Both sides race their blocking waits against a [`CancellationToken`].
//!
//! Receivers are cloneable: any number of consumers can drain the same channel,
//! each message going to exactly one of them.

use crate::message::Message;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_util::sync::CancellationToken;

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;

/// Why a handoff send did not complete
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandoffError {
    #[error("handoff cancelled")]
    Cancelled,

    #[error("all receivers dropped")]
    Closed,
}

/// Message in transit plus the notification fired when a consumer takes it
#[derive(Debug)]
struct Delivery {
    message: Message,
    taken: oneshot::Sender<()>,
}

/// Create a connected sender/receiver pair
pub fn channel() -> (HandoffSender, HandoffReceiver) {
    // One slot holds the message being offered; the taken notification provides
    // the rendezvous, so nothing is ever buffered past the current send.
    let (tx, rx) = mpsc::channel(1);
    (
        HandoffSender { tx },
        HandoffReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Sending half, owned by the watcher
#[derive(Debug, Clone)]
pub struct HandoffSender {
    tx: mpsc::Sender<Delivery>,
}

impl HandoffSender {
    /// Offer `message` and wait until a consumer has taken it
    ///
    /// Returns [`HandoffError::Cancelled`] if `token` is cancelled first, and
    /// [`HandoffError::Closed`] if every receiver is gone.
    pub async fn send(
        &self,
        message: Message,
        token: &CancellationToken,
    ) -> Result<(), HandoffError> {
        let (taken_tx, taken_rx) = oneshot::channel();
        let delivery = Delivery {
            message,
            taken: taken_tx,
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => return Err(HandoffError::Cancelled),
            sent = self.tx.send(delivery) => sent.map_err(|_| HandoffError::Closed)?,
        }

        // A message already taken counts as handed off even if cancellation raced it
        tokio::select! {
            biased;
            taken = taken_rx => taken.map_err(|_| HandoffError::Closed),
            _ = token.cancelled() => Err(HandoffError::Cancelled),
        }
    }

    /// Check if every receiver has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, shared by consumers
#[derive(Debug, Clone)]
pub struct HandoffReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Delivery>>>,
}

impl HandoffReceiver {
    /// Take the next message, or `None` once every sender is gone
    ///
    /// Cancel safe: dropping the future before it resolves never loses a message.
    pub async fn recv(&self) -> Option<Message> {
        let delivery = self.rx.lock().await.recv().await?;

        // The sender may have been cancelled while waiting; the message is still ours
        let _ = delivery.taken.send(());
        Some(delivery.message)
    }
}
