//! src/parallel/config.rs
//!
//! Configuration for the parallel engine.
//!
//! Example:
//! ```ignore
//! let config = ParallelConfig::builder()
//!     .num_workers(4)
//!     .queue_factor(64)
//!     .timeout(Duration::from_secs(60))
//!     .build();
//! ```
//!
//! # Memory
//! Both queues hold at most `queue_factor x num_workers` elements, so the number
//! of elements in flight is bounded regardless of the source length.

use std::sync::Arc;
use std::time::Duration;

use crate::error::PipelineError;
use crate::stats::PipelineStats;

/// Per-worker queue slots used when none is configured.
pub const DEFAULT_QUEUE_FACTOR: usize = 64;

/// Configuration for `ValueIter::apply_parallel_with`
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Number of workers. `None` picks the CPU count, capped at the source
    /// length when it is known. Values below 1 are raised to 1.
    pub num_workers: Option<usize>,
    /// Queue capacity per worker (must be > 0)
    pub queue_factor: usize,
    /// Maximum time the consumer waits for the next output.
    /// `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// How often blocked producer/worker threads check for shutdown.
    /// Not an error timeout - just a polling interval. Default: 100ms.
    pub worker_timeout: Duration,
    /// How long closing a stage waits for its threads after asking them to
    /// stop. Threads still busy in a mapper call after that are detached;
    /// they exit on their own once the call returns. Default: 1s.
    pub join_timeout: Duration,
    /// Prefix for spawned thread names
    pub thread_name: String,
    /// Optional instrumentation sink
    pub stats: Option<Arc<PipelineStats>>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            num_workers: None,
            queue_factor: DEFAULT_QUEUE_FACTOR,
            timeout: None,
            worker_timeout: Duration::from_millis(100),
            join_timeout: Duration::from_secs(1),
            thread_name: "value-pipe".to_string(),
            stats: None,
        }
    }
}

impl ParallelConfig {
    pub fn builder() -> ParallelConfigBuilder {
        ParallelConfigBuilder::default()
    }

    /// Capacity of each of the two queues for `num_workers` workers.
    pub fn queue_capacity(&self, num_workers: usize) -> usize {
        self.queue_factor.saturating_mul(num_workers)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.queue_factor == 0 {
            return Err(PipelineError::InvalidConfig(
                "queue_factor must be > 0; a zero-capacity queue turns every send into a rendezvous"
                    .to_string(),
            ));
        }
        if self.worker_timeout.is_zero() {
            return Err(PipelineError::InvalidConfig(
                "worker_timeout must be > 0".to_string(),
            ));
        }
        if matches!(self.timeout, Some(t) if t.is_zero()) {
            return Err(PipelineError::InvalidConfig(
                "timeout must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for ParallelConfig with method chaining
#[derive(Default)]
pub struct ParallelConfigBuilder {
    config: ParallelConfig,
}

impl ParallelConfigBuilder {
    /// Set the number of workers
    pub fn num_workers(mut self, workers: usize) -> Self {
        self.config.num_workers = Some(workers);
        self
    }

    /// Set the per-worker queue capacity
    pub fn queue_factor(mut self, factor: usize) -> Self {
        self.config.queue_factor = factor;
        self
    }

    /// Set the consumer-side timeout.
    ///
    /// - Too low: may fail during legitimately slow mapping.
    /// - Too high: delays detection of stuck workers.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the shutdown polling interval
    pub fn worker_timeout(mut self, worker_timeout: Duration) -> Self {
        self.config.worker_timeout = worker_timeout;
        self
    }

    /// Set how long closing a stage waits for busy threads
    pub fn join_timeout(mut self, join_timeout: Duration) -> Self {
        self.config.join_timeout = join_timeout;
        self
    }

    /// Set the thread name prefix
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Attach instrumentation counters
    pub fn stats(mut self, stats: Arc<PipelineStats>) -> Self {
        self.config.stats = Some(stats);
        self
    }

    /// Build the final configuration.
    pub fn build(self) -> ParallelConfig {
        self.config
    }
}
