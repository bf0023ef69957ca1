//! src/parallel/iterator.rs
//!
//! The collector: the iterator handed back by `apply_parallel` for more than
//! one worker.
//!
//! # States
//! - `Pending`: nothing spawned yet; the first `next()` starts the pool
//! - `Collecting`: draining the output queue, counting `Done` signals
//! - `Cancelled`: a failure was handed out and the threads were asked to stop;
//!   the next `next()` joins them and ends the sequence
//! - `Closed`: pool released; only `None` from here on
//!
//! A failure is returned as soon as it is received: the collector only raises
//! the shutdown flag before handing it out and never waits on siblings that
//! may be busy in a long mapper call. After a timeout the threads are detached
//! rather than joined, since at least one of them is presumed stuck.

use anyhow::Result;
use crossbeam_channel::{RecvError, RecvTimeoutError};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};

use super::config::ParallelConfig;
use super::workers::pool::WorkerPool;
use super::workers::Message;
use crate::error::PipelineError;
use crate::mapper::Mapper;
use crate::value_iter::ValueIter;

enum State<T, F, U> {
    Pending {
        source: ValueIter<'static, T>,
        make_mapper: Arc<F>,
    },
    Collecting {
        pool: WorkerPool<U>,
        workers_done: usize,
    },
    Cancelled {
        pool: WorkerPool<U>,
    },
    Closed,
}

/// Fan-in side of one parallel stage.
pub(crate) struct ParallelIter<T, F, M>
where
    M: Mapper<T>,
{
    state: State<T, F, M::Output>,
    num_workers: usize,
    config: ParallelConfig,
    _mapper: PhantomData<fn() -> M>,
}

impl<T, F, M> ParallelIter<T, F, M>
where
    T: Send + 'static,
    F: Fn(usize) -> Result<M> + Send + Sync + 'static,
    M: Mapper<T> + 'static,
    M::Output: Send + 'static,
{
    pub(crate) fn new(
        source: ValueIter<'static, T>,
        make_mapper: F,
        num_workers: usize,
        config: ParallelConfig,
    ) -> Self {
        Self {
            state: State::Pending {
                source,
                make_mapper: Arc::new(make_mapper),
            },
            num_workers,
            config,
            _mapper: PhantomData,
        }
    }

    /// Spawns the pool on first use.
    fn start(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, State::Closed) {
            State::Pending {
                source,
                make_mapper,
            } => {
                let pool =
                    WorkerPool::spawn(source, make_mapper, self.num_workers, &self.config)?;
                self.state = State::Collecting {
                    pool,
                    workers_done: 0,
                };
            }
            other => self.state = other,
        }
        Ok(())
    }

    /// Ends the sequence. Dropping the pool joins its threads.
    fn close(&mut self) {
        self.state = State::Closed;
    }

    /// Asks every thread to stop and hands out `error` without waiting.
    fn fail(&mut self, error: anyhow::Error, detach: bool) -> Option<Result<M::Output>> {
        warn!(error = %error, "parallel stage failed, cancelling remaining workers");
        if let State::Collecting { mut pool, .. } =
            std::mem::replace(&mut self.state, State::Closed)
        {
            pool.cancel();
            if detach {
                pool.detach();
            } else {
                self.state = State::Cancelled { pool };
            }
        }
        Some(Err(error))
    }
}

impl<T, F, M> Iterator for ParallelIter<T, F, M>
where
    T: Send + 'static,
    F: Fn(usize) -> Result<M> + Send + Sync + 'static,
    M: Mapper<T> + 'static,
    M::Output: Send + 'static,
{
    type Item = Result<M::Output>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            State::Pending { .. } => {
                if let Err(e) = self.start() {
                    return Some(Err(e));
                }
            }
            State::Cancelled { .. } => {
                self.close();
                return None;
            }
            _ => {}
        }

        loop {
            let State::Collecting { pool, workers_done } = &mut self.state else {
                return None;
            };

            let received = match self.config.timeout {
                Some(timeout) => pool.output_rx.recv_timeout(timeout),
                None => pool
                    .output_rx
                    .recv()
                    .map_err(|RecvError| RecvTimeoutError::Disconnected),
            };

            match received {
                Ok(Message::Item(output)) => return Some(Ok(output)),
                Ok(Message::Done { worker_id }) => {
                    *workers_done += 1;
                    debug!(worker_id, workers_done = *workers_done, "worker done");
                    if *workers_done >= self.num_workers {
                        self.close();
                        return None;
                    }
                }
                Ok(Message::Failed(error)) => return self.fail(error, false),
                Err(RecvTimeoutError::Timeout) => {
                    let timeout = self.config.timeout.unwrap_or_default();
                    return self.fail(PipelineError::Timeout(timeout).into(), true);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    let done = *workers_done;
                    return self.fail(
                        PipelineError::Disconnected {
                            done,
                            expected: self.num_workers,
                        }
                        .into(),
                        false,
                    );
                }
            }
        }
    }
}
