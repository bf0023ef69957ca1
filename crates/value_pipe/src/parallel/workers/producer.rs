//! src/parallel/workers/producer.rs
//!
//! The producer pulls the source in order and feeds the input queue.
//!
//! Whatever happens to the source (exhaustion, an `Err` element, a panic), the
//! producer finishes by queueing one `Task::Stop` per worker so every worker
//! observes the end of work on its own. Only a shutdown request skips this,
//! since nobody is waiting for the workers anymore.

use crossbeam_channel::Sender;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::{send_blocking, Message, Task};
use crate::error::{panic_message, PipelineError};
use crate::stats::PipelineStats;
use crate::value_iter::ValueIter;

pub(crate) struct Producer<T, U> {
    pub(crate) task_tx: Sender<Task<T>>,
    pub(crate) output_tx: Sender<Message<U>>,
    pub(crate) num_workers: usize,
    pub(crate) shutdown: Arc<AtomicBool>,
    pub(crate) poll: Duration,
    pub(crate) stats: Option<Arc<PipelineStats>>,
}

impl<T, U> Producer<T, U> {
    pub(crate) fn run(self, source: ValueIter<'static, T>) {
        debug!(num_workers = self.num_workers, "producer started");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.feed(source)));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(PipelineError::SourceFailed(e)),
            Err(payload) => Some(PipelineError::ProducerPanicked(panic_message(
                payload.as_ref(),
            ))),
        };

        if let Some(failure) = failure {
            warn!(error = %failure, "producer stopped early");
            send_blocking(
                &self.output_tx,
                Message::Failed(failure.into()),
                &self.shutdown,
                self.poll,
                || {},
            );
        }

        for _ in 0..self.num_workers {
            if !send_blocking(&self.task_tx, Task::Stop, &self.shutdown, self.poll, || {}) {
                break;
            }
        }

        debug!("producer finished");
    }

    /// Pushes every source element; stops at the first `Err` and returns it.
    fn feed(&self, source: ValueIter<'static, T>) -> anyhow::Result<()> {
        for item in source {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }
            let item = item?;

            let delivered = send_blocking(
                &self.task_tx,
                Task::Item(item),
                &self.shutdown,
                self.poll,
                || {
                    trace!("input queue full, producer waiting");
                    if let Some(stats) = &self.stats {
                        stats.add_producer_blocked();
                    }
                },
            );
            if !delivered {
                return Ok(());
            }
            if let Some(stats) = &self.stats {
                stats.add_item_produced();
            }
        }
        Ok(())
    }
}
