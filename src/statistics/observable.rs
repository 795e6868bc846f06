//! Per-observable running summary (mean, sum of squared deviations, count)
//!
//! Folding uses the pairwise form of Chan et al.'s parallel algorithm, which
//! covers single samples (Welford's update), pre-aggregated batches and the
//! merge of two records with the same arithmetic.

use crate::math;
use crate::traits::{Merge, RecordError, ShapeMismatch};

use super::Estimate;

#[cfg(feature = "std")]
use std::vec::Vec;

#[cfg(not(feature = "std"))]
use alloc::{vec, vec::Vec};

/// Shape of an observable, fixed for the lifetime of its record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Shape {
    /// Single number, stored as one component
    Scalar,
    /// Fixed-length vector
    Vector(usize),
}

impl Shape {
    /// Number of components a value of this shape carries
    pub fn components(self) -> usize {
        match self {
            Shape::Scalar => 1,
            Shape::Vector(len) => len,
        }
    }

    /// Whether this is the scalar shape
    pub fn is_scalar(self) -> bool {
        matches!(self, Shape::Scalar)
    }

    /// Check that a value with `found` components fits this shape
    pub(crate) fn check(self, found: usize) -> Result<(), ShapeMismatch> {
        let expected = self.components();
        if expected == found {
            Ok(())
        } else {
            Err(ShapeMismatch { expected, found })
        }
    }
}

/// Running summary of one observable
///
/// Holds the mean, the sum of squared deviations from the mean (M2) and the
/// sample count. M2 is kept undivided because it is the sufficient statistic
/// for combining two records exactly.
///
/// # Example
///
/// ```
/// use obstat::statistics::Observable;
///
/// let mut energy = Observable::scalar();
/// for value in [1.0, 2.0, 3.0] {
///     energy.push(&[value]).unwrap();
/// }
///
/// let estimate = energy.estimate().unwrap();
/// assert_eq!(estimate.count(), 3);
/// assert_eq!(estimate.scalar(), Some((2.0, 1.0)));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawObservable"))]
pub struct Observable {
    shape: Shape,
    mean: Vec<f64>,
    sum_sq_dev: Vec<f64>,
    count: u64,
}

impl Observable {
    /// Zero-initialized scalar record
    pub fn scalar() -> Self {
        Self::zeroed(Shape::Scalar)
    }

    /// Zero-initialized vector record of the given length
    pub fn vector(len: usize) -> Self {
        Self::zeroed(Shape::Vector(len))
    }

    /// Zero-initialized record of the given shape
    pub fn zeroed(shape: Shape) -> Self {
        let len = shape.components();
        Self {
            shape,
            mean: vec![0.0; len],
            sum_sq_dev: vec![0.0; len],
            count: 0,
        }
    }

    /// Scalar record with explicit initial values
    ///
    /// `sum_sq_dev` must be non-negative.
    pub fn from_scalar(mean: f64, sum_sq_dev: f64, count: u64) -> Result<Self, RecordError> {
        Self::from_parts(Shape::Scalar, vec![mean], vec![sum_sq_dev], count)
    }

    /// Record with explicit initial values
    ///
    /// Both arrays must match the shape and every `sum_sq_dev` entry must be
    /// non-negative. A zero `count` yields the zeroed record regardless of
    /// the supplied values.
    pub fn from_parts(
        shape: Shape,
        mean: Vec<f64>,
        sum_sq_dev: Vec<f64>,
        count: u64,
    ) -> Result<Self, RecordError> {
        shape.check(mean.len())?;
        shape.check(sum_sq_dev.len())?;
        check_non_negative(&sum_sq_dev)?;

        if count == 0 {
            return Ok(Self::zeroed(shape));
        }

        Ok(Self {
            shape,
            mean,
            sum_sq_dev,
            count,
        })
    }

    /// Vector record with explicit initial values, its length taken from `mean`
    pub fn from_vector(
        mean: Vec<f64>,
        sum_sq_dev: Vec<f64>,
        count: u64,
    ) -> Result<Self, RecordError> {
        Self::from_parts(Shape::Vector(mean.len()), mean, sum_sq_dev, count)
    }

    /// Shape fixed at construction
    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// Running mean, one entry per component
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Accumulated sum of squared deviations, one entry per component
    pub fn sum_sq_dev(&self) -> &[f64] {
        &self.sum_sq_dev
    }

    /// Number of samples folded in
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Whether no samples have been folded in
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Decompose into `(mean, sum_sq_dev, count)`
    pub fn into_parts(self) -> (Vec<f64>, Vec<f64>, u64) {
        (self.mean, self.sum_sq_dev, self.count)
    }

    /// Fold in a single sample
    pub fn push(&mut self, value: &[f64]) -> Result<(), RecordError> {
        self.fold(value, None, 1)
    }

    /// Fold in a batch of `n` samples with mean `value`
    ///
    /// `aux_sum_sq_dev` is the batch's own sum of squared deviations and
    /// must be non-negative; `None` means zero. Fails if the count would
    /// overflow `u64`. The record is unchanged on error. A batch with
    /// `n == 0` is a no-op once its inputs have been validated.
    pub fn fold(
        &mut self,
        value: &[f64],
        aux_sum_sq_dev: Option<&[f64]>,
        n: u64,
    ) -> Result<(), RecordError> {
        self.shape.check(value.len())?;
        if let Some(aux) = aux_sum_sq_dev {
            self.shape.check(aux.len())?;
            check_non_negative(aux)?;
        }
        let new_count = self.checked_count(n)?;

        if n == 0 {
            return Ok(());
        }

        if self.count == 0 {
            self.mean.copy_from_slice(value);
            match aux_sum_sq_dev {
                Some(aux) => self.sum_sq_dev.copy_from_slice(aux),
                None => self.sum_sq_dev.iter_mut().for_each(|s| *s = 0.0),
            }
            self.count = n;
            return Ok(());
        }

        let count = self.count as f64;
        let total = new_count as f64;
        let n_f = n as f64;

        for (i, (&x, mean)) in value.iter().zip(self.mean.iter_mut()).enumerate() {
            let delta = x - *mean;
            let shift = delta * n_f / total;
            *mean += shift;
            // delta^2 * count * n / (count + n)
            let aux = aux_sum_sq_dev.map_or(0.0, |a| a[i]);
            self.sum_sq_dev[i] += aux + delta * shift * count;
        }
        self.count = new_count;

        Ok(())
    }

    /// Count after adding `n` samples, or an overflow error
    pub(crate) fn checked_count(&self, n: u64) -> Result<u64, RecordError> {
        self.count
            .checked_add(n)
            .ok_or(RecordError::CountOverflow {
                count: self.count,
                added: n,
            })
    }

    /// Return to the zeroed state, keeping the shape
    pub fn reset(&mut self) {
        self.mean.iter_mut().for_each(|m| *m = 0.0);
        self.sum_sq_dev.iter_mut().for_each(|s| *s = 0.0);
        self.count = 0;
    }

    /// Mean, dispersion and count
    ///
    /// The dispersion is the unbiased sample standard deviation
    /// `sqrt(sum_sq_dev / (count - 1))`, not the standard error of the mean.
    /// Returns `None` when fewer than two samples have been folded in.
    pub fn estimate(&self) -> Option<Estimate> {
        if self.count < 2 {
            return None;
        }

        let dof = (self.count - 1) as f64;
        let dispersion = self
            .sum_sq_dev
            .iter()
            .map(|&s| math::sqrt(s / dof))
            .collect();

        Some(Estimate::new(
            self.shape,
            self.mean.clone(),
            dispersion,
            self.count,
        ))
    }
}

impl Merge for Observable {
    type Error = RecordError;

    fn merge_in_place(&mut self, other: &Self) -> Result<(), RecordError> {
        self.fold(&other.mean, Some(other.sum_sq_dev.as_slice()), other.count)
    }
}

fn check_non_negative(sum_sq_dev: &[f64]) -> Result<(), RecordError> {
    match sum_sq_dev.iter().position(|&s| s < 0.0) {
        Some(component) => Err(RecordError::NegativeSumSqDev {
            component,
            value: sum_sq_dev[component],
        }),
        None => Ok(()),
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawObservable {
    shape: Shape,
    mean: Vec<f64>,
    sum_sq_dev: Vec<f64>,
    count: u64,
}

#[cfg(feature = "serde")]
impl TryFrom<RawObservable> for Observable {
    type Error = RecordError;

    fn try_from(raw: RawObservable) -> Result<Self, Self::Error> {
        Self::from_parts(raw.shape, raw.mean, raw.sum_sq_dev, raw.count)
    }
}
