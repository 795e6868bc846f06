//! Evaluated statistics of observables

use core::fmt;

use crate::math;

use super::Shape;

#[cfg(feature = "serde")]
use crate::traits::ShapeMismatch;

#[cfg(feature = "std")]
use std::{string::String, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec::Vec};

/// Mean, dispersion and sample count of one observable
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawEstimate"))]
pub struct Estimate {
    shape: Shape,
    mean: Vec<f64>,
    dispersion: Vec<f64>,
    count: u64,
}

impl Estimate {
    pub(crate) fn new(shape: Shape, mean: Vec<f64>, dispersion: Vec<f64>, count: u64) -> Self {
        Self {
            shape,
            mean,
            dispersion,
            count,
        }
    }

    /// Shape of the evaluated observable
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Sample mean, per component
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Sample standard deviation of the folded values, per component
    pub fn dispersion(&self) -> &[f64] {
        &self.dispersion
    }

    /// Number of samples behind the estimate
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Unbiased sample variance, per component
    pub fn variance(&self) -> Vec<f64> {
        self.dispersion.iter().map(|d| d * d).collect()
    }

    /// Standard error of the mean, `dispersion / sqrt(count)`
    ///
    /// Only meaningful when the folded samples are uncorrelated.
    pub fn standard_error(&self) -> Vec<f64> {
        let root_n = math::sqrt(self.count as f64);
        self.dispersion.iter().map(|d| d / root_n).collect()
    }

    /// `(mean, dispersion)` of a scalar observable, `None` for vectors
    pub fn scalar(&self) -> Option<(f64, f64)> {
        if !self.shape.is_scalar() {
            return None;
        }
        Some((*self.mean.first()?, *self.dispersion.first()?))
    }
}

pub(crate) fn write_components(f: &mut fmt::Formatter<'_>, shape: Shape, values: &[f64]) -> fmt::Result {
    if shape.is_scalar() {
        return write!(f, "{}", values[0]);
    }
    f.write_str("[")?;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", v)?;
    }
    f.write_str("]")
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_components(f, self.shape, &self.mean)?;
        f.write_str(" ± ")?;
        write_components(f, self.shape, &self.dispersion)?;
        write!(f, " (n = {})", self.count)
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawEstimate {
    shape: Shape,
    mean: Vec<f64>,
    dispersion: Vec<f64>,
    count: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawEstimate> for Estimate {
    type Error = ShapeMismatch;

    fn try_from(raw: RawEstimate) -> Result<Self, Self::Error> {
        raw.shape.check(raw.mean.len())?;
        raw.shape.check(raw.dispersion.len())?;
        Ok(Self::new(raw.shape, raw.mean, raw.dispersion, raw.count))
    }
}

/// Estimates for several observables, in the order they were requested
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    entries: Vec<(String, Estimate)>,
}

impl Evaluation {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, name: String, estimate: Estimate) {
        self.entries.push((name, estimate));
    }

    /// Look up the estimate of one observable
    pub fn get(&self, name: &str) -> Option<&Estimate> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, estimate)| estimate)
    }

    /// Number of evaluated observables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was evaluated
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in evaluation order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Name and estimate pairs in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Estimate)> {
        self.entries
            .iter()
            .map(|(name, estimate)| (name.as_str(), estimate))
    }
}

impl IntoIterator for Evaluation {
    type Item = (String, Estimate);
    type IntoIter = <Vec<(String, Estimate)> as IntoIterator>::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
