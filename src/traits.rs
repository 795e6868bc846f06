//! Core traits and error types
//!
//! Every summary in this crate implements [`Merge`], which combines two
//! independently accumulated summaries into one as if all underlying samples
//! had been accumulated together.

use core::fmt;

#[cfg(feature = "std")]
use std::{string::String, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

/// Length mismatch between a record and a value folded into it
///
/// Carried by [`RecordError::Shape`]. The accumulator lifts it into
/// [`StatError::DimensionMismatch`] via [`ShapeMismatch::for_variable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeMismatch {
    /// Number of components the record holds
    pub expected: usize,
    /// Number of components that were supplied
    pub found: usize,
}

impl ShapeMismatch {
    /// Attach a variable name, producing the accumulator-level error
    pub fn for_variable(self, name: &str) -> StatError {
        StatError::DimensionMismatch {
            name: name.into(),
            expected: self.expected,
            found: self.found,
        }
    }
}

impl fmt::Display for ShapeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dimension mismatch: expected {} components, found {}",
            self.expected, self.found
        )
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ShapeMismatch {}

/// Error raised by record-level operations on an
/// [`Observable`](crate::statistics::Observable)
///
/// Records do not know the name they are stored under; the accumulator lifts
/// these into [`StatError`] via [`RecordError::for_variable`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordError {
    /// Value length disagrees with the record's fixed length
    Shape(ShapeMismatch),
    /// Sample count would exceed `u64::MAX`
    CountOverflow { count: u64, added: u64 },
    /// A sum of squared deviations was negative
    NegativeSumSqDev { component: usize, value: f64 },
}

impl RecordError {
    /// Attach a variable name, producing the accumulator-level error
    pub fn for_variable(self, name: &str) -> StatError {
        match self {
            RecordError::Shape(mismatch) => mismatch.for_variable(name),
            RecordError::CountOverflow { count, added } => StatError::CountOverflow {
                name: name.into(),
                count,
                added,
            },
            RecordError::NegativeSumSqDev { component, .. } => StatError::NegativeSumSqDev {
                name: name.into(),
                component,
            },
        }
    }
}

impl From<ShapeMismatch> for RecordError {
    fn from(mismatch: ShapeMismatch) -> Self {
        RecordError::Shape(mismatch)
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::Shape(mismatch) => fmt::Display::fmt(mismatch, f),
            RecordError::CountOverflow { count, added } => {
                write!(f, "sample count overflow: {} + {}", count, added)
            }
            RecordError::NegativeSumSqDev { component, value } => write!(
                f,
                "negative sum of squared deviations at component {}: {}",
                component, value
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RecordError {}

/// Error raised by accumulator operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatError {
    /// Operation referenced a name that was never declared
    UnknownVariable { name: String },
    /// Value length disagrees with the record's fixed length
    DimensionMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    /// Merge between accumulators with differing variable sets
    VariableSetMismatch {
        /// Names declared only by the left-hand accumulator
        only_in_self: Vec<String>,
        /// Names declared only by the right-hand accumulator
        only_in_other: Vec<String>,
    },
    /// Dispersion requested with fewer than two samples
    InsufficientSamples { name: String, count: u64 },
    /// The same name appears twice in a deserialized variable list
    DuplicateVariable { name: String },
    /// Folding would push the sample count past `u64::MAX`
    CountOverflow { name: String, count: u64, added: u64 },
    /// A supplied sum of squared deviations was negative
    NegativeSumSqDev { name: String, component: usize },
}

impl StatError {
    /// Name of the offending variable, if the error concerns a single one
    pub fn variable(&self) -> Option<&str> {
        match self {
            StatError::UnknownVariable { name }
            | StatError::DimensionMismatch { name, .. }
            | StatError::InsufficientSamples { name, .. }
            | StatError::DuplicateVariable { name }
            | StatError::CountOverflow { name, .. }
            | StatError::NegativeSumSqDev { name, .. } => Some(name),
            StatError::VariableSetMismatch { .. } => None,
        }
    }

    pub(crate) fn unknown(name: &str) -> Self {
        StatError::UnknownVariable { name: name.into() }
    }
}

fn write_names(f: &mut fmt::Formatter<'_>, names: &[String]) -> fmt::Result {
    f.write_str("[")?;
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{:?}", name)?;
    }
    f.write_str("]")
}

impl fmt::Display for StatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatError::UnknownVariable { name } => write!(f, "unknown variable: {:?}", name),
            StatError::DimensionMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "dimension mismatch for {:?}: expected {}, found {}",
                name, expected, found
            ),
            StatError::VariableSetMismatch {
                only_in_self,
                only_in_other,
            } => {
                f.write_str("variable sets differ: only in self ")?;
                write_names(f, only_in_self)?;
                f.write_str(", only in other ")?;
                write_names(f, only_in_other)
            }
            StatError::InsufficientSamples { name, count } => write!(
                f,
                "insufficient samples for {:?}: dispersion needs at least 2, have {}",
                name, count
            ),
            StatError::DuplicateVariable { name } => write!(f, "duplicate variable: {:?}", name),
            StatError::CountOverflow { name, count, added } => write!(
                f,
                "sample count overflow for {:?}: {} + {}",
                name, count, added
            ),
            StatError::NegativeSumSqDev { name, component } => write!(
                f,
                "negative sum of squared deviations for {:?} at component {}",
                name, component
            ),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for StatError {}

/// Combination of two independently accumulated summaries
///
/// Implementations must be associative and commutative in exact arithmetic,
/// so that partial results from independent workers can be combined in any
/// grouping. Floating-point rounding may differ between groupings.
pub trait Merge: Sized + Clone {
    /// Error raised when the two summaries are incompatible
    type Error;

    /// Fold `other` into `self`
    ///
    /// On error `self` is left untouched.
    fn merge_in_place(&mut self, other: &Self) -> Result<(), Self::Error>;

    /// Combine two summaries into a new one, leaving both inputs untouched
    fn merge(&self, other: &Self) -> Result<Self, Self::Error> {
        let mut combined = self.clone();
        combined.merge_in_place(other)?;
        Ok(combined)
    }

    /// Combine any number of summaries, left to right
    ///
    /// Returns `Ok(None)` for an empty input.
    fn merge_all<I>(parts: I) -> Result<Option<Self>, Self::Error>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut parts = parts.into_iter();
        let mut combined = match parts.next() {
            Some(first) => first,
            None => return Ok(None),
        };
        for part in parts {
            combined.merge_in_place(&part)?;
        }
        Ok(Some(combined))
    }
}
