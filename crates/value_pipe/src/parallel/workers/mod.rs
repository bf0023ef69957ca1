//! Producer and worker threads of the parallel engine.
//!
//! - `pool`: spawns the threads and owns their lifecycle
//! - `producer`: feeds the input queue from the source
//! - `worker`: maps input items into the output queue
//!
//! Both queues carry tagged elements instead of a shared "no more work" value,
//! so a legitimate payload can never be mistaken for a termination signal.

pub(crate) mod pool;
pub(crate) mod producer;
pub(crate) mod worker;

use crossbeam_channel::{SendTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Element of the input queue (producer -> workers).
#[derive(Debug)]
pub(crate) enum Task<T> {
    Item(T),
    /// End of work. The producer sends exactly one per worker.
    Stop,
}

/// Element of the output queue (workers/producer -> collector).
#[derive(Debug)]
pub(crate) enum Message<U> {
    Item(U),
    /// A failure to surface to the consumer; carries a `PipelineError`.
    Failed(anyhow::Error),
    /// A worker left its loop. Exactly one per worker.
    Done { worker_id: usize },
}

/// Sends `msg`, waiting while the queue is full.
///
/// `on_block` runs once if the first attempt finds the queue full. Returns
/// `false` when the message could not be delivered because the receiving side
/// is gone or shutdown was requested.
pub(crate) fn send_blocking<M>(
    tx: &Sender<M>,
    msg: M,
    shutdown: &AtomicBool,
    poll: Duration,
    on_block: impl FnOnce(),
) -> bool {
    let mut msg = match tx.try_send(msg) {
        Ok(()) => return true,
        Err(TrySendError::Disconnected(_)) => return false,
        Err(TrySendError::Full(msg)) => {
            on_block();
            msg
        }
    };

    loop {
        if shutdown.load(Ordering::Relaxed) {
            return false;
        }
        match tx.send_timeout(msg, poll) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => msg = back,
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}
