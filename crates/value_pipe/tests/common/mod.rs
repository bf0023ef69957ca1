#![allow(dead_code)]

use anyhow::{anyhow, Result};
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use value_pipe::{current_worker_id, Mapper};

/// Mapper that sleeps a random few milliseconds before returning its input,
/// so that completion order differs from input order.
pub struct JitterIdentity {
    pub max_delay_ms: u64,
}

impl Mapper<u64> for JitterIdentity {
    type Output = u64;

    fn apply(&mut self, input: u64) -> Result<Option<u64>> {
        let delay = rand::rng().random_range(0..=self.max_delay_ms);
        thread::sleep(Duration::from_millis(delay));
        Ok(Some(input))
    }
}

/// Drops even numbers.
pub struct DropEven;

impl Mapper<u64> for DropEven {
    type Output = u64;

    fn apply(&mut self, input: u64) -> Result<Option<u64>> {
        Ok((input % 2 == 1).then_some(input))
    }
}

/// Fails on the `fail_at`-th item it sees (1-based).
pub struct FailsOnNth {
    pub seen: usize,
    pub fail_at: usize,
}

impl Mapper<u64> for FailsOnNth {
    type Output = u64;

    fn apply(&mut self, input: u64) -> Result<Option<u64>> {
        self.seen += 1;
        if self.seen == self.fail_at {
            return Err(anyhow!("boom on item {}", input));
        }
        Ok(Some(input))
    }
}

/// Records which worker thread maps each element.
pub struct Tagging {
    pub worker: usize,
}

impl Mapper<u64> for Tagging {
    type Output = (usize, Option<usize>, u64);

    fn apply(&mut self, input: u64) -> Result<Option<Self::Output>> {
        Ok(Some((self.worker, current_worker_id(), input)))
    }
}

/// Factory bookkeeping shared with the test body.
#[derive(Clone, Default)]
pub struct FactoryLog {
    pub calls: Arc<AtomicUsize>,
    pub indices: Arc<Mutex<Vec<usize>>>,
}

impl FactoryLog {
    pub fn record(&self, worker: usize) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut indices) = self.indices.lock() {
            indices.push(worker);
        }
    }

    pub fn sorted_indices(&self) -> Vec<usize> {
        let mut indices = self.indices.lock().map(|v| v.clone()).unwrap_or_default();
        indices.sort_unstable();
        indices
    }
}

pub fn sorted(mut v: Vec<u64>) -> Vec<u64> {
    v.sort_unstable();
    v
}
