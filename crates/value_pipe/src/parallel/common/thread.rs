//! Thread-local storage for worker identification.
//!
//! Each worker thread records its index when spawned so that mappers (and log
//! lines) can tell which worker they run on.

use std::cell::Cell;

thread_local! {
    /// Index of the worker running on this thread (0 to num_workers-1),
    /// `None` outside worker threads.
    static WORKER_ID: Cell<Option<usize>> = const { Cell::new(None) };
}

pub(crate) fn set_worker_id(worker_id: usize) {
    WORKER_ID.with(|id| id.set(Some(worker_id)));
}

/// Index of the parallel worker executing the current thread.
///
/// Returns `None` on the caller's thread, including the in-process path taken
/// when only one worker is requested.
pub fn current_worker_id() -> Option<usize> {
    WORKER_ID.with(|id| id.get())
}
