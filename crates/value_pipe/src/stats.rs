//! Counters for observing a parallel pipeline while it runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Instrumentation for the parallel engine.
///
/// Attach one through `ParallelConfig::builder().stats(...)`. All counters are
/// updated with relaxed atomics and may be read at any time.
#[derive(Debug, Default)]
pub struct PipelineStats {
    /// Elements pulled from the source and queued by the producer
    pub items_produced: AtomicU64,

    /// Times the producer found the input queue full and had to wait
    pub producer_blocked: AtomicU64,

    /// Times a worker found the output queue full and had to wait
    pub worker_blocked: AtomicU64,

    /// Mapped elements sent to the collector
    pub items_emitted: AtomicU64,

    /// Elements a mapper dropped
    pub items_dropped: AtomicU64,

    /// Workers that reached their mapper factory
    pub workers_started: AtomicU64,

    /// Workers that left their loop (normally or not)
    pub workers_finished: AtomicU64,

    /// Mapper or factory failures, panics included
    pub worker_failures: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub items_produced: u64,
    pub producer_blocked: u64,
    pub worker_blocked: u64,
    pub items_emitted: u64,
    pub items_dropped: u64,
    pub workers_started: u64,
    pub workers_finished: u64,
    pub worker_failures: u64,
}

impl PipelineStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_item_produced(&self) {
        self.items_produced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_producer_blocked(&self) {
        self.producer_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_worker_blocked(&self) {
        self.worker_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_item_emitted(&self) {
        self.items_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_item_dropped(&self) {
        self.items_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_worker_started(&self) {
        self.workers_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_worker_finished(&self) {
        self.workers_finished.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_worker_failure(&self) {
        self.worker_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            items_produced: self.items_produced.load(Ordering::Relaxed),
            producer_blocked: self.producer_blocked.load(Ordering::Relaxed),
            worker_blocked: self.worker_blocked.load(Ordering::Relaxed),
            items_emitted: self.items_emitted.load(Ordering::Relaxed),
            items_dropped: self.items_dropped.load(Ordering::Relaxed),
            workers_started: self.workers_started.load(Ordering::Relaxed),
            workers_finished: self.workers_finished.load(Ordering::Relaxed),
            worker_failures: self.worker_failures.load(Ordering::Relaxed),
        }
    }
}
