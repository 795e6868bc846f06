//! Streaming mean/variance summaries of named observables
//!
//! This module provides single-pass, constant-memory summaries that can be
//! merged across independent runs of a stochastic computation.
//!
//! - [`Observable`]: running mean, sum of squared deviations and count of one
//!   scalar or fixed-length vector quantity
//! - [`Accumulator`]: a named set of observables with declare, add, reset,
//!   remove, evaluate and merge operations
//!
//! # Example
//!
//! ```
//! use obstat::statistics::{Accumulator, Declaration};
//! use obstat::traits::Merge;
//!
//! let declarations = [Declaration::scalar("energy"), Declaration::vector("density", 3)];
//! let mut run1 = Accumulator::from_declarations(declarations.clone());
//! let mut run2 = Accumulator::from_declarations(declarations);
//!
//! run1.add_scalars("energy", [-1.2, -1.1]).unwrap();
//! run1.add_value("density", &[0.1, 0.2, 0.3]).unwrap();
//! run2.add_scalars("energy", [-1.0, -1.3]).unwrap();
//! run2.add_value("density", &[0.3, 0.2, 0.1]).unwrap();
//!
//! let combined = run1.merge(&run2).unwrap();
//! let evaluation = combined.evaluate_all().unwrap();
//!
//! for (name, estimate) in evaluation.iter() {
//!     println!("{}: {}", name, estimate);
//! }
//! assert_eq!(evaluation.get("energy").unwrap().count(), 4);
//! ```

mod accumulator;
mod estimate;
mod observable;

pub use accumulator::{Accumulator, Declaration};
pub use estimate::{Estimate, Evaluation};
pub use observable::{Observable, Shape};
