//! # Supervisor
//!
//! Runs queue roles concurrently under one cancellation scope. The first role to
//! fail cancels the shared token, every other role then winds down, and the first
//! error is what [`Supervisor::wait`] reports.

use crate::consumer::Consumer;
use crate::error::QueueError;
use crate::watcher::Watcher;
use std::fmt;
use std::future::Future;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Name of a supervised role, used in logs and task failure reports
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleName(String);

impl RoleName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Owns the shared cancellation token and the spawned role tasks
pub struct Supervisor {
    token: CancellationToken,
    tasks: JoinSet<(RoleName, Result<(), QueueError>)>,
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl Supervisor {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Supervise under an existing token, e.g. a child of a process-wide token
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            tasks: JoinSet::new(),
        }
    }

    /// Token observed by every supervised role
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Number of roles not yet joined
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Spawn an arbitrary role future
    pub fn spawn<F>(&mut self, role: RoleName, task: F)
    where
        F: Future<Output = Result<(), QueueError>> + Send + 'static,
    {
        debug!(role = %role, "Spawning queue role");
        self.tasks.spawn(async move { (role, task.await) });
    }

    pub fn spawn_watcher(&mut self, watcher: Watcher) {
        let token = self.token();
        self.spawn(RoleName::new("watcher"), async move {
            watcher.run(token).await
        });
    }

    pub fn spawn_consumer(&mut self, name: impl Into<String>, consumer: Consumer) {
        let token = self.token();
        self.spawn(RoleName::new(name), async move { consumer.run(token).await });
    }

    /// Cancel every supervised role
    pub fn shutdown(&self) {
        info!("Shutting down queue roles");
        self.token.cancel();
    }

    /// Join every role, cancelling the rest on the first failure
    ///
    /// Returns the first error observed, or `Ok(())` if every role stopped cleanly.
    pub async fn wait(mut self) -> Result<(), QueueError> {
        let mut first_error = None;

        while let Some(joined) = self.tasks.join_next().await {
            let failure = match joined {
                Ok((role, Ok(()))) => {
                    debug!(role = %role, "Queue role finished");
                    None
                }
                Ok((role, Err(e))) => {
                    error!(role = %role, error = %e, "Queue role failed");
                    Some(e)
                }
                Err(join_error) => {
                    error!(error = %join_error, "Queue role task aborted");
                    Some(QueueError::TaskFailed {
                        role: "unknown".to_string(),
                        message: join_error.to_string(),
                    })
                }
            };

            if let Some(e) = failure {
                self.token.cancel();
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
