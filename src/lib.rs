//! # Obstat
//!
//! Mergeable streaming statistics for Monte Carlo observables.
//!
//! Obstat keeps running means and variances of named scalar and vector
//! observables in a single pass, and combines summaries from independent
//! runs into one estimate as if every sample had been accumulated together.
//!
//! ## Features
//!
//! - **Welford updates**: numerically stable single-sample and batch folds
//! - **Vector observables**: fixed-length arrays, evaluated component-wise
//! - **Exact merging**: Chan et al.'s parallel formula, associative and
//!   commutative in exact arithmetic
//! - **Checked evaluation**: too few samples is an error, never a silent NaN
//!
//! ## Quick Start
//!
//! ```rust
//! use obstat::prelude::*;
//!
//! let mut stats = Accumulator::from_declarations(["e"]);
//! stats.add_scalars("e", [1.0, 2.0, 3.0]).unwrap();
//!
//! let e = stats.get("e").unwrap();
//! assert_eq!(e.scalar(), Some((2.0, 1.0)));
//! println!("{}", stats);
//! ```
//!
//! ## Distributed Computing
//!
//! Accumulators implement the [`Merge`](traits::Merge) trait, so each worker
//! can accumulate its own shard and the results are combined afterwards:
//!
//! ```rust
//! use obstat::statistics::Accumulator;
//! use obstat::traits::Merge;
//!
//! let shards: Vec<Accumulator> = (0..4)
//!     .map(|seed| {
//!         let mut shard = Accumulator::from_declarations(["e"]);
//!         shard.add_scalars("e", [seed as f64, seed as f64 + 1.0]).unwrap();
//!         shard
//!     })
//!     .collect();
//!
//! let combined = Accumulator::merge_all(shards).unwrap().unwrap();
//! assert_eq!(combined.get("e").unwrap().count(), 8);
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Standard library support
//! - `serde`: Enable serialization
//! - `tracing`: Emit lifecycle events through `tracing`

#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(docsrs, feature(doc_cfg))]

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "tracing")]
macro_rules! event {
    ($level:ident, $($arg:tt)+) => {
        tracing::$level!($($arg)+)
    };
}

#[cfg(not(feature = "tracing"))]
macro_rules! event {
    ($level:ident, $($arg:tt)+) => {};
}

mod math;

pub mod statistics;
pub mod traits;

pub mod prelude {
    pub use crate::statistics::{Accumulator, Declaration, Estimate, Evaluation, Observable, Shape};
    pub use crate::traits::*;
}

pub use statistics::{Accumulator, Observable};
pub use traits::{Merge, RecordError, StatError};
