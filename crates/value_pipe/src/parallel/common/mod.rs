//! src/parallel/common/mod.rs
//!
//! Utilities shared by the producer, the workers and the collector.

pub mod thread;
