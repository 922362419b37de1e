//! Per-sink delivery counters

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters of a single sink, shared between its handle and worker
#[derive(Debug, Default)]
pub struct SinkMetrics {
    queue_len: AtomicUsize,
    written: AtomicU64,
    failed: AtomicU64,
    superseded: AtomicU64,
    /// Sequence number of the last snapshot written, plus one (0 = none)
    last_sequence: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    /// Snapshots written successfully
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    pub fn record_written(&self, sequence: u64) {
        self.written.fetch_add(1, Ordering::Relaxed);
        self.last_sequence.fetch_max(sequence + 1, Ordering::Relaxed);
    }

    /// Snapshots the sink failed to write
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Queued snapshots replaced by a newer one before delivery
    pub fn superseded(&self) -> u64 {
        self.superseded.load(Ordering::Relaxed)
    }

    pub fn record_superseded(&self) {
        self.superseded.fetch_add(1, Ordering::Relaxed);
    }

    /// Sequence number of the newest snapshot written
    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence.load(Ordering::Relaxed).checked_sub(1)
    }

    pub fn snapshot(&self) -> SinkMetricsSnapshot {
        SinkMetricsSnapshot {
            queue_len: self.queue_len(),
            written: self.written(),
            failed: self.failed(),
            superseded: self.superseded(),
            last_sequence: self.last_sequence(),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkMetricsSnapshot {
    pub queue_len: usize,
    pub written: u64,
    pub failed: u64,
    pub superseded: u64,
    pub last_sequence: Option<u64>,
}
