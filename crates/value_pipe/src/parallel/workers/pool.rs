//! Thread pool behind one `apply_parallel` stage.
//!
//! Owns the producer thread, the worker threads and the receiving end of the
//! output queue:
//! - Input queue: producer -> workers (shared, workers pull in turn)
//! - Output queue: workers -> collector
//! - Shutdown flag: asks every thread to stop at its next wait
//!
//! Both queues are bounded to `queue_factor x num_workers`, which is what gives
//! the pipeline its backpressure.
//!
//! Joining is bounded by `join_timeout`: a thread stuck inside a mapper call
//! cannot observe the shutdown flag, so it is detached instead of waited on.

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, Receiver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::producer::Producer;
use super::worker::Worker;
use super::Message;
use crate::mapper::Mapper;
use crate::parallel::common::thread::set_worker_id;
use crate::parallel::config::ParallelConfig;
use crate::value_iter::ValueIter;

/// Sleep between `is_finished` checks while joining.
const JOIN_POLL: Duration = Duration::from_millis(5);

pub(crate) struct WorkerPool<Output> {
    pub(crate) producer: Option<thread::JoinHandle<()>>,
    pub(crate) workers: Vec<thread::JoinHandle<()>>,
    pub(crate) output_rx: Receiver<Message<Output>>,
    pub(crate) shutdown: Arc<AtomicBool>,
    pub(crate) join_timeout: Duration,
}

impl<Output> WorkerPool<Output>
where
    Output: Send + 'static,
{
    /// Spawns one producer over `source` and `num_workers` workers.
    pub(crate) fn spawn<T, F, M>(
        source: ValueIter<'static, T>,
        make_mapper: Arc<F>,
        num_workers: usize,
        config: &ParallelConfig,
    ) -> Result<Self>
    where
        T: Send + 'static,
        F: Fn(usize) -> Result<M> + Send + Sync + 'static,
        M: Mapper<T, Output = Output> + 'static,
    {
        config.validate()?;
        let capacity = config.queue_capacity(num_workers);
        let (task_tx, task_rx) = bounded(capacity);
        let (output_tx, output_rx) = bounded(capacity);
        let shutdown = Arc::new(AtomicBool::new(false));

        debug!(num_workers, capacity, "spawning parallel stage");

        // Built first so that a spawn failure below drops (and joins) whatever
        // already runs.
        let mut pool = Self {
            producer: None,
            workers: Vec::with_capacity(num_workers),
            output_rx,
            shutdown: shutdown.clone(),
            join_timeout: config.join_timeout,
        };

        for worker_id in 0..num_workers {
            let worker = Worker {
                worker_id,
                task_rx: task_rx.clone(),
                output_tx: output_tx.clone(),
                shutdown: shutdown.clone(),
                poll: config.worker_timeout,
                stats: config.stats.clone(),
            };
            let make_mapper = make_mapper.clone();

            let handle = thread::Builder::new()
                .name(format!("{}-worker-{}", config.thread_name, worker_id))
                .spawn(move || {
                    set_worker_id(worker_id);
                    worker.run(&*make_mapper);
                })
                .with_context(|| format!("Failed to spawn worker thread {}", worker_id))?;

            pool.workers.push(handle);
        }
        drop(task_rx);

        let producer = Producer {
            task_tx,
            output_tx,
            num_workers,
            shutdown,
            poll: config.worker_timeout,
            stats: config.stats.clone(),
        };
        let handle = thread::Builder::new()
            .name(format!("{}-producer", config.thread_name))
            .spawn(move || producer.run(source))
            .context("Failed to spawn producer thread")?;
        pool.producer = Some(handle);

        Ok(pool)
    }
}

impl<Output> WorkerPool<Output> {
    /// Asks every thread to stop at its next wait.
    pub(crate) fn cancel(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Waits up to `join_timeout` for the producer and every worker to exit,
    /// then detaches whatever is still running.
    pub(crate) fn join(&mut self) {
        let deadline = Instant::now() + self.join_timeout;
        let mut handles: Vec<(Option<usize>, thread::JoinHandle<()>)> = self
            .producer
            .take()
            .map(|handle| (None, handle))
            .into_iter()
            .chain(
                self.workers
                    .drain(..)
                    .enumerate()
                    .map(|(worker_id, handle)| (Some(worker_id), handle)),
            )
            .collect();

        loop {
            let (finished, running): (Vec<_>, Vec<_>) = handles
                .into_iter()
                .partition(|(_, handle)| handle.is_finished());

            for (worker_id, handle) in finished {
                if handle.join().is_err() {
                    match worker_id {
                        Some(worker_id) => warn!(worker_id, "worker thread panicked"),
                        None => warn!("producer thread panicked"),
                    }
                }
            }

            if running.is_empty() {
                return;
            }
            if Instant::now() >= deadline {
                warn!(
                    remaining = running.len(),
                    "threads still busy after join_timeout, detaching"
                );
                return;
            }
            handles = running;
            thread::sleep(JOIN_POLL);
        }
    }

    /// Lets every thread finish on its own without waiting for it.
    pub(crate) fn detach(&mut self) {
        let detached = self.workers.len() + usize::from(self.producer.is_some());
        self.producer = None;
        self.workers.clear();
        debug!(detached, "detached parallel stage threads");
    }
}

impl<Output> Drop for WorkerPool<Output> {
    fn drop(&mut self) {
        // Returns at once after a completed run or a detach.
        self.cancel();
        self.join();
    }
}
