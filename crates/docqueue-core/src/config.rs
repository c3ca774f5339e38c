//! Watcher configuration.

use crate::error::ConfigurationError;
use std::time::Duration;

/// Default number of messages fetched per scan
pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Default wait between scans
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Polling cadence and page size for the watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherConfig {
    /// Maximum number of unprocessed messages fetched per scan
    pub page_size: usize,
    /// Fixed wait between the end of one page and the next scan
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl WatcherConfig {
    pub fn new(page_size: usize, poll_interval: Duration) -> Self {
        Self {
            page_size,
            poll_interval,
        }
    }

    /// Reject values the watcher loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.page_size == 0 {
            return Err(ConfigurationError::Invalid {
                field: "page_size".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        if self.poll_interval.is_zero() {
            return Err(ConfigurationError::Invalid {
                field: "poll_interval".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
