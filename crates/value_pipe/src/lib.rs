//! Lazy, composable value pipelines with an optional parallel stage.
//!
//! - [`Value`]: one value, transformed eagerly
//! - [`ValueIter`]: a lazy, single-pass sequence, transformed with [`Mapper`]s
//! - [`ValueIter::apply_parallel`]: fan a sequence out to a pool of worker
//!   threads, each with its own mapper, and collect results as they complete
//!
//! ```
//! use value_pipe::{mapper, ValueIter};
//!
//! let odd = ValueIter::new(vec![1, 2, 3, 4])
//!     .apply(mapper::filter_map(|x: i32| (x % 2 == 1).then_some(x)))
//!     .collect::<anyhow::Result<Vec<_>>>()
//!     .unwrap();
//! assert_eq!(odd, vec![1, 3]);
//! ```

pub mod error;
pub mod mapper;
pub mod parallel;
pub mod stats;
pub mod value;
pub mod value_iter;

pub use error::PipelineError;
pub use mapper::Mapper;
pub use parallel::{current_worker_id, ParallelConfig, ParallelConfigBuilder};
pub use stats::{PipelineStats, StatsSnapshot};
pub use value::Value;
pub use value_iter::ValueIter;
