//! Backpressure settings and frame counters

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub use contracts::BackpressurePolicy;
use contracts::IngestionConfig;

/// Channel size and what a source does when it is full
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackpressureConfig {
    pub channel_capacity: usize,
    pub policy: BackpressurePolicy,
}

impl Default for BackpressureConfig {
    fn default() -> Self {
        Self::new(256, BackpressurePolicy::Block)
    }
}

impl BackpressureConfig {
    pub fn new(channel_capacity: usize, policy: BackpressurePolicy) -> Self {
        Self {
            channel_capacity,
            policy,
        }
    }
}

impl From<&IngestionConfig> for BackpressureConfig {
    fn from(config: &IngestionConfig) -> Self {
        Self::new(config.channel_capacity, config.backpressure)
    }
}

/// Totals over every source, shared by all adapters
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    queue_len: AtomicUsize,
}

impl IngestionMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.frames_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    pub fn frames_dropped(&self) -> u64 {
        self.frames_dropped.load(Ordering::Relaxed)
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }
}

/// Counters of a single source
#[derive(Debug, Default)]
pub struct SourceCounters {
    received: AtomicU64,
    dropped: AtomicU64,
}

impl SourceCounters {
    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn counts(&self, skipped: u64) -> SourceCounts {
        SourceCounts {
            received: self.received.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            skipped,
        }
    }
}

/// Frames seen from one source
///
/// A dropped frame is a gap in that session's angle series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceCounts {
    pub received: u64,
    pub dropped: u64,
    /// Unreadable records skipped by the source itself
    pub skipped: u64,
}

/// Point-in-time view of the ingestion counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub queue_len: usize,
    /// Sum of `skipped` over all sources
    pub parse_errors: u64,
    pub per_source: BTreeMap<String, SourceCounts>,
}
