//! Shared counters for queue activity.
//!
//! Every role holds an `Arc<QueueMetrics>`; counters are plain atomics so no role
//! owns them and no lock is needed.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic activity counters shared by producer, watcher, and consumers
#[derive(Debug, Default)]
pub struct QueueMetrics {
    messages_sent: AtomicU64,
    scans: AtomicU64,
    messages_dispatched: AtomicU64,
    messages_processed: AtomicU64,
}

/// Point-in-time copy of [`QueueMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub messages_sent: u64,
    pub scans: u64,
    pub messages_dispatched: u64,
    pub messages_processed: u64,
}

impl QueueMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatched(&self) {
        self.messages_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_processed(&self) {
        self.messages_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            scans: self.scans.load(Ordering::Relaxed),
            messages_dispatched: self.messages_dispatched.load(Ordering::Relaxed),
            messages_processed: self.messages_processed.load(Ordering::Relaxed),
        }
    }
}
