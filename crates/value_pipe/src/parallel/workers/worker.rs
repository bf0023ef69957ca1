//! src/parallel/workers/worker.rs
//!
//! Worker loop of the parallel engine.
//!
//! # Lifecycle
//! 1. Init: build the worker-local mapper with `make_mapper(worker_id)`
//! 2. Looping: take one task, map it, forward the result unless dropped
//! 3. Draining: drop the mapper, send `Message::Done`
//! 4. Terminated
//!
//! A failing or panicking mapper (or factory) does not skip step 3: the worker
//! reports `Message::Failed` first and then drains as usual, so the collector
//! always receives one `Done` per worker.

use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::{send_blocking, Message, Task};
use crate::error::{panic_message, PipelineError};
use crate::mapper::Mapper;
use crate::stats::PipelineStats;

pub(crate) struct Worker<T, U> {
    pub(crate) worker_id: usize,
    pub(crate) task_rx: Receiver<Task<T>>,
    pub(crate) output_tx: Sender<Message<U>>,
    pub(crate) shutdown: Arc<AtomicBool>,
    pub(crate) poll: Duration,
    pub(crate) stats: Option<Arc<PipelineStats>>,
}

impl<T, U> Worker<T, U> {
    pub(crate) fn run<F, M>(self, make_mapper: &F)
    where
        F: Fn(usize) -> Result<M>,
        M: Mapper<T, Output = U>,
    {
        let worker_id = self.worker_id;
        if let Some(stats) = &self.stats {
            stats.add_worker_started();
        }
        debug!(worker_id, "worker starting");

        let init = panic::catch_unwind(AssertUnwindSafe(|| make_mapper(worker_id)));
        match init {
            Ok(Ok(mut mapper)) => {
                if let Err(failure) = self.process(&mut mapper) {
                    self.report(failure);
                }
                // Worker-local state goes away before the worker reports done.
                drop(mapper);
            }
            Ok(Err(source)) => self.report(PipelineError::MapperInit { worker_id, source }),
            Err(payload) => self.report(PipelineError::WorkerPanicked {
                worker_id,
                message: panic_message(payload.as_ref()),
            }),
        }

        if let Some(stats) = &self.stats {
            stats.add_worker_finished();
        }
        send_blocking(
            &self.output_tx,
            Message::Done { worker_id },
            &self.shutdown,
            self.poll,
            || {},
        );
        debug!(worker_id, "worker finished");
    }

    /// Runs until a `Stop` task, a shutdown request or the first failure.
    fn process<M>(&self, mapper: &mut M) -> Result<(), PipelineError>
    where
        M: Mapper<T, Output = U>,
    {
        let worker_id = self.worker_id;
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }

            let item = match self.task_rx.recv_timeout(self.poll) {
                Ok(Task::Item(item)) => item,
                Ok(Task::Stop) => return Ok(()),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(()),
            };

            let mapped = panic::catch_unwind(AssertUnwindSafe(|| mapper.apply(item)));
            let output = match mapped {
                Ok(Ok(Some(output))) => output,
                Ok(Ok(None)) => {
                    if let Some(stats) = &self.stats {
                        stats.add_item_dropped();
                    }
                    continue;
                }
                Ok(Err(source)) => return Err(PipelineError::WorkerFailed { worker_id, source }),
                Err(payload) => {
                    return Err(PipelineError::WorkerPanicked {
                        worker_id,
                        message: panic_message(payload.as_ref()),
                    })
                }
            };

            let delivered = send_blocking(
                &self.output_tx,
                Message::Item(output),
                &self.shutdown,
                self.poll,
                || {
                    trace!(worker_id, "output queue full, worker waiting");
                    if let Some(stats) = &self.stats {
                        stats.add_worker_blocked();
                    }
                },
            );
            if !delivered {
                return Ok(());
            }
            if let Some(stats) = &self.stats {
                stats.add_item_emitted();
            }
        }
    }

    fn report(&self, failure: PipelineError) {
        warn!(worker_id = self.worker_id, error = %failure, "worker failed");
        if let Some(stats) = &self.stats {
            stats.add_worker_failure();
        }
        send_blocking(
            &self.output_tx,
            Message::Failed(failure.into()),
            &self.shutdown,
            self.poll,
            || {},
        );
    }
}
