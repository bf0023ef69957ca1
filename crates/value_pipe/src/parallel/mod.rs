//! src/parallel/mod.rs
//!
//! Fan-out/fan-in execution of a mapper over a `ValueIter`.
//!
//! # Architecture Overview
//!
//! ```text
//!                 ┌──────────┐
//!                 │  source  │ (ValueIter, pulled in order)
//!                 └────┬─────┘
//!                      ↓
//!                 ┌──────────┐
//!                 │ producer │ one thread; N x Stop after the last item
//!                 └────┬─────┘
//!                      ↓  input queue (bounded, queue_factor x N)
//!        ┌─────────────┼─────────────┐
//!        ↓             ↓             ↓
//!   ┌─────────┐   ┌─────────┐   ┌─────────┐
//!   │worker 0 │   │worker 1 │...│worker N-1│ make_mapper(i) once each
//!   └────┬────┘   └────┬────┘   └────┬────┘
//!        └─────────────┼─────────────┘
//!                      ↓  output queue (bounded, queue_factor x N)
//!                 ┌──────────┐
//!                 │collector │ the returned ValueIter; ends after N x Done
//!                 └──────────┘
//! ```
//!
//! Output order follows completion order across workers, not input order.
//! With a single worker no thread is spawned: the mapper from `make_mapper(0)`
//! is applied in-process and order is preserved.
//!
//! # Module Structure
//!
//! ```text
//! src/parallel/
//! ├── mod.rs          # apply_parallel entry points, worker count resolution
//! ├── config.rs       # ParallelConfig, builder, and validation
//! ├── iterator.rs     # collector (lazy start, termination, failure handling)
//! ├── workers/
//! │   ├── mod.rs      # queue element types and backpressure-aware send
//! │   ├── pool.rs     # WorkerPool: spawn, cancel, join
//! │   ├── producer.rs # producer loop
//! │   └── worker.rs   # worker loop
//! └── common/
//!     └── thread.rs   # thread-local worker id
//! ```
//!
//! # Example Usage
//! ```
//! use value_pipe::{mapper, ValueIter};
//!
//! let doubled = ValueIter::new(0..100u64)
//!     .apply_parallel(|_worker| Ok(mapper::from_fn(|x: u64| x * 2)), Some(4))
//!     .unwrap();
//! let mut out = doubled.collect::<anyhow::Result<Vec<_>>>().unwrap();
//! out.sort();
//! assert_eq!(out, (0..100u64).map(|x| x * 2).collect::<Vec<_>>());
//! ```

mod common;
mod config;
mod iterator;
mod workers;

pub use common::thread::current_worker_id;
pub use config::{ParallelConfig, ParallelConfigBuilder, DEFAULT_QUEUE_FACTOR};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::mapper::Mapper;
use crate::value_iter::ValueIter;
use iterator::ParallelIter;

impl<T> ValueIter<'static, T>
where
    T: Send + 'static,
{
    /// Maps the sequence on `num_workers` threads (see [`Self::apply_parallel_with`]).
    pub fn apply_parallel<F, M>(
        self,
        make_mapper: F,
        num_workers: Option<usize>,
    ) -> Result<ValueIter<'static, M::Output>>
    where
        F: Fn(usize) -> Result<M> + Send + Sync + 'static,
        M: Mapper<T> + 'static,
        M::Output: Send + 'static,
    {
        let config = ParallelConfig {
            num_workers,
            ..ParallelConfig::default()
        };
        self.apply_parallel_with(make_mapper, config)
    }

    /// Maps the sequence with a pool of workers, each owning the mapper built
    /// by `make_mapper(worker_index)`.
    ///
    /// With one worker the mapper is built here and applied lazily on the
    /// caller's thread, exactly like [`ValueIter::apply`]; a factory error is
    /// returned immediately.
    ///
    /// With more workers nothing starts until the first element is requested.
    /// Failures of the source, a factory or a mapper (panics included) come
    /// out of the returned sequence as a single `Err` carrying a
    /// [`PipelineError`](crate::PipelineError), after which the sequence ends.
    /// Dropping the returned sequence early stops and joins all threads,
    /// waiting at most `join_timeout` for a thread stuck in a mapper call.
    ///
    /// # Errors differ between the two paths
    /// With one worker the result is exactly `self.apply(make_mapper(0)?)`:
    /// source and mapper errors are yielded in place and iteration may go on
    /// past them. With more workers the first error ends the sequence.
    ///
    /// # Borrowed sources
    /// Both paths require a `'static` source of `Send` elements, even though
    /// one worker spawns no thread. For a borrowed source build the mapper
    /// yourself and call [`ValueIter::apply`]:
    ///
    /// ```compile_fail
    /// use value_pipe::{mapper, ValueIter};
    ///
    /// let data = vec![1u64, 2, 3];
    /// let borrowed = ValueIter::new(data.iter().copied());
    /// let _ = borrowed.apply_parallel(|_| Ok(mapper::from_fn(|x: u64| x)), Some(1));
    /// ```
    ///
    /// ```
    /// use value_pipe::{mapper, ValueIter};
    ///
    /// let data = vec![1u64, 2, 3];
    /// let make_mapper = |_worker: usize| anyhow::Ok(mapper::from_fn(|x: u64| x + 1));
    /// let out = ValueIter::new(data.iter().copied())
    ///     .apply(make_mapper(0).unwrap())
    ///     .collect::<anyhow::Result<Vec<_>>>()
    ///     .unwrap();
    /// assert_eq!(out, vec![2, 3, 4]);
    /// ```
    pub fn apply_parallel_with<F, M>(
        self,
        make_mapper: F,
        config: ParallelConfig,
    ) -> Result<ValueIter<'static, M::Output>>
    where
        F: Fn(usize) -> Result<M> + Send + Sync + 'static,
        M: Mapper<T> + 'static,
        M::Output: Send + 'static,
    {
        config.validate()?;
        let num_workers = resolve_num_workers(config.num_workers, self.known_len());

        if num_workers == 1 {
            debug!("single worker requested, mapping in-process");
            let mapper =
                make_mapper(0).context("Failed to build the mapper for worker 0")?;
            return Ok(self.apply(mapper));
        }

        let collector = ParallelIter::new(self, make_mapper, num_workers, config);
        Ok(ValueIter::from_boxed(Box::new(collector)))
    }
}

/// Number of workers to run for an optional request and source length.
///
/// Never returns 0: an explicit 0, or an empty source, still gets one worker.
pub fn resolve_num_workers(requested: Option<usize>, known_len: Option<usize>) -> usize {
    match requested {
        Some(0) => {
            warn!("num_workers = 0 requested, using 1");
            1
        }
        Some(n) => n,
        None => {
            let cpus = num_cpus::get();
            known_len.map_or(cpus, |len| cpus.min(len)).max(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_num_workers() {
        assert_eq!(resolve_num_workers(Some(3), None), 3);
        assert_eq!(resolve_num_workers(Some(3), Some(1)), 3);
        assert_eq!(resolve_num_workers(Some(0), None), 1);
        assert_eq!(resolve_num_workers(None, Some(0)), 1);
        assert_eq!(resolve_num_workers(None, Some(1)), 1);
        assert_eq!(resolve_num_workers(None, None), num_cpus::get().max(1));
        assert!(resolve_num_workers(None, Some(2)) <= 2);
    }
}
