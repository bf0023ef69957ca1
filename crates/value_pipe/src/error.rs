//! Failures reported by the parallel engine.
//!
//! The public API returns `anyhow::Result`; these variants sit inside the
//! `anyhow::Error` and can be recovered with `downcast_ref::<PipelineError>()`.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("worker {worker_id} failed to build its mapper")]
    MapperInit {
        worker_id: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("worker {worker_id} failed while mapping an item")]
    WorkerFailed {
        worker_id: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("worker {worker_id} panicked: {message}")]
    WorkerPanicked { worker_id: usize, message: String },

    #[error("source sequence yielded an error")]
    SourceFailed(#[source] anyhow::Error),

    #[error("producer panicked while pulling from the source: {0}")]
    ProducerPanicked(String),

    #[error("output queue closed after {done} of {expected} workers finished")]
    Disconnected { done: usize, expected: usize },

    #[error("no output from workers within {0:?} (possible deadlock or slow mapper)")]
    Timeout(Duration),

    #[error("invalid parallel config: {0}")]
    InvalidConfig(String),
}

impl PipelineError {
    /// Index of the worker the failure belongs to, if any.
    pub fn worker_id(&self) -> Option<usize> {
        match self {
            Self::MapperInit { worker_id, .. }
            | Self::WorkerFailed { worker_id, .. }
            | Self::WorkerPanicked { worker_id, .. } => Some(*worker_id),
            _ => None,
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
