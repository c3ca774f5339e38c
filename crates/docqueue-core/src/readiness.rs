//! One-shot readiness signalling and bounded waits.
//!
//! A [`ReadySignal`] is set once by the role that becomes ready and observed by any
//! number of waiters. Waiters are woken by the set itself, not by polling a flag.

use crate::error::ReadinessError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Single-assignment readiness flag
///
/// Clones share the same underlying signal. Setting is idempotent and the flag
/// never resets.
#[derive(Debug, Clone)]
pub struct ReadySignal {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for ReadySignal {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadySignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Mark the signal as ready, waking all current waiters
    pub fn set(&self) {
        self.sender.send_if_modified(|ready| {
            if *ready {
                false
            } else {
                *ready = true;
                true
            }
        });
    }

    pub fn is_ready(&self) -> bool {
        *self.sender.borrow()
    }

    /// Wait until the signal is set
    pub async fn wait(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = receiver.wait_for(|ready| *ready).await;
    }

    /// Wait until the signal is set or `timeout` elapses
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<(), ReadinessError> {
        await_within(self.wait(), timeout).await
    }
}

/// Run `future` to completion unless `timeout` elapses first
///
/// # Examples
///
/// ```
/// use docqueue_core::readiness::await_within;
/// use std::time::Duration;
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let value = await_within(async { 42 }, Duration::from_secs(1)).await;
/// assert_eq!(value, Ok(42));
/// # }
/// ```
pub async fn await_within<F>(future: F, timeout: Duration) -> Result<F::Output, ReadinessError>
where
    F: Future,
{
    tokio::time::timeout(timeout, future)
        .await
        .map_err(|_| ReadinessError::Timeout { duration: timeout })
}

/// Wait for a oneshot completion notification, bounded by `timeout`
///
/// A dropped sender is reported as [`ReadinessError::Abandoned`].
pub async fn await_notification(
    receiver: tokio::sync::oneshot::Receiver<()>,
    timeout: Duration,
) -> Result<(), ReadinessError> {
    await_within(receiver, timeout)
        .await?
        .map_err(|_| ReadinessError::Abandoned)
}

#[cfg(test)]
#[path = "readiness_tests.rs"]
mod tests;
