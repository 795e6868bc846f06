//! Named set of observables with a shared lifecycle
//!
//! An [`Accumulator`] co-manages independent [`Observable`] records under
//! string keys, remembers their declaration order, and merges with another
//! accumulator declaring exactly the same variables.

use core::fmt;

use crate::traits::{Merge, StatError};

use super::estimate::write_components;
use super::{Estimate, Evaluation, Observable, Shape};

#[cfg(feature = "std")]
use std::{collections::BTreeMap, string::String, vec::Vec};

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, string::String, vec::Vec};

/// Declaration of one observable
///
/// Converts from a bare name (scalar) or a `(name, length)` pair (vector):
///
/// ```
/// use obstat::statistics::{Declaration, Shape};
///
/// let energy: Declaration = "energy".into();
/// let density: Declaration = ("density", 64).into();
///
/// assert_eq!(energy.shape(), Shape::Scalar);
/// assert_eq!(density.shape(), Shape::Vector(64));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Declaration {
    Scalar(String),
    Vector(String, usize),
}

impl Declaration {
    /// Scalar observable
    pub fn scalar(name: impl Into<String>) -> Self {
        Declaration::Scalar(name.into())
    }

    /// Vector observable of fixed length `len`
    pub fn vector(name: impl Into<String>, len: usize) -> Self {
        Declaration::Vector(name.into(), len)
    }

    /// Declared name
    pub fn name(&self) -> &str {
        match self {
            Declaration::Scalar(name) | Declaration::Vector(name, _) => name,
        }
    }

    /// Shape the record will be created with
    pub fn shape(&self) -> Shape {
        match self {
            Declaration::Scalar(_) => Shape::Scalar,
            Declaration::Vector(_, len) => Shape::Vector(*len),
        }
    }

    fn into_entry(self) -> (String, Observable) {
        let shape = self.shape();
        let name = match self {
            Declaration::Scalar(name) | Declaration::Vector(name, _) => name,
        };
        (name, Observable::zeroed(shape))
    }
}

impl From<&str> for Declaration {
    fn from(name: &str) -> Self {
        Declaration::scalar(name)
    }
}

impl From<String> for Declaration {
    fn from(name: String) -> Self {
        Declaration::Scalar(name)
    }
}

impl From<(&str, usize)> for Declaration {
    fn from((name, len): (&str, usize)) -> Self {
        Declaration::vector(name, len)
    }
}

impl From<(String, usize)> for Declaration {
    fn from((name, len): (String, usize)) -> Self {
        Declaration::Vector(name, len)
    }
}

/// Streaming mean/variance accumulator for a named set of observables
///
/// Each variable is a scalar or fixed-length vector [`Observable`]. Values
/// are folded in with Welford's update; two accumulators over the same
/// variables combine with Chan et al.'s parallel formula, so partial results
/// from independent runs can be merged in any grouping.
///
/// # Example
///
/// ```
/// use obstat::statistics::Accumulator;
///
/// let mut stats = Accumulator::from_declarations(["e"]);
/// stats.add_scalars("e", [1.0, 2.0, 3.0]).unwrap();
///
/// let e = stats.get("e").unwrap();
/// assert_eq!(e.count(), 3);
/// assert_eq!(e.scalar(), Some((2.0, 1.0)));
/// ```
///
/// # Distributed Usage
///
/// ```
/// use obstat::statistics::Accumulator;
/// use obstat::traits::Merge;
///
/// let mut run1 = Accumulator::from_declarations([("g", 2)]);
/// let mut run2 = run1.clone();
///
/// run1.add_value("g", &[1.0, 4.0]).unwrap();
/// run2.add_value("g", &[3.0, 8.0]).unwrap();
///
/// let combined = run1.merge(&run2).unwrap();
/// assert_eq!(combined.observable("g").unwrap().mean(), &[2.0, 6.0]);
/// ```
///
/// Folding the same samples in a different order gives the same mean and
/// dispersion in exact arithmetic, but the floating-point rounding may differ.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(
        into = "Vec<(String, Observable)>",
        try_from = "Vec<(String, Observable)>"
    )
)]
pub struct Accumulator {
    /// Records in declaration order
    entries: Vec<(String, Observable)>,
    /// Name to position in `entries`
    index: BTreeMap<String, usize>,
}

impl Accumulator {
    /// Create an accumulator with no variables
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: BTreeMap::new(),
        }
    }

    /// Create an accumulator with zero-initialized variables
    ///
    /// A name declared twice keeps its first position and takes the shape
    /// of its last declaration.
    pub fn from_declarations<I, D>(declarations: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Declaration>,
    {
        let mut stats = Self::new();
        for declaration in declarations {
            let (name, record) = declaration.into().into_entry();
            stats.insert(name, record);
        }
        stats
    }

    /// Number of declared variables
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no variable is declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `name` is declared
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Variable names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Raw records in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Observable)> {
        self.entries
            .iter()
            .map(|(name, record)| (name.as_str(), record))
    }

    /// Raw record of one variable
    pub fn observable(&self, name: &str) -> Option<&Observable> {
        self.index.get(name).map(|&i| &self.entries[i].1)
    }

    /// Shape of one variable, `None` if undeclared
    pub fn shape(&self, name: &str) -> Option<Shape> {
        self.observable(name).map(Observable::shape)
    }

    fn record_mut(&mut self, name: &str) -> Result<&mut Observable, StatError> {
        match self.index.get(name) {
            Some(&i) => Ok(&mut self.entries[i].1),
            None => Err(StatError::unknown(name)),
        }
    }

    /// Insert or overwrite, without shape checks
    fn insert(&mut self, name: String, record: Observable) {
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = record,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, record));
            }
        }
    }

    /// Declare a zero-initialized variable
    ///
    /// Redeclaring an existing variable resets it; its shape must not change.
    pub fn declare(&mut self, declaration: impl Into<Declaration>) -> Result<(), StatError> {
        let (name, record) = declaration.into().into_entry();
        self.set_variable(name, record)
    }

    /// Shorthand for [`declare`](Self::declare) with a scalar declaration
    pub fn declare_scalar(&mut self, name: impl Into<String>) -> Result<(), StatError> {
        self.declare(Declaration::scalar(name))
    }

    /// Shorthand for [`declare`](Self::declare) with a vector declaration
    pub fn declare_vector(&mut self, name: impl Into<String>, len: usize) -> Result<(), StatError> {
        self.declare(Declaration::vector(name, len))
    }

    /// Create or overwrite a variable with explicit initial values
    ///
    /// Fails with [`StatError::DimensionMismatch`] if the variable exists with
    /// a different length.
    pub fn set_variable(
        &mut self,
        name: impl Into<String>,
        record: Observable,
    ) -> Result<(), StatError> {
        let name = name.into();
        if let Some(existing) = self.shape(&name) {
            existing
                .check(record.shape().components())
                .map_err(|e| e.for_variable(&name))?;
        }

        event!(
            debug,
            variable = name.as_str(),
            count = record.count(),
            "declared variable"
        );
        self.insert(name, record);
        Ok(())
    }

    /// Delete a variable and return its record
    pub fn remove_variable(&mut self, name: &str) -> Result<Observable, StatError> {
        let position = self
            .index
            .remove(name)
            .ok_or_else(|| StatError::unknown(name))?;
        let (_, record) = self.entries.remove(position);
        for i in self.index.values_mut() {
            if *i > position {
                *i -= 1;
            }
        }

        event!(
            debug,
            variable = name,
            count = record.count(),
            "removed variable"
        );
        Ok(record)
    }

    /// Return a variable to its zero state, keeping its length
    pub fn reset_variable(&mut self, name: &str) -> Result<(), StatError> {
        self.record_mut(name)?.reset();
        event!(debug, variable = name, "reset variable");
        Ok(())
    }

    /// Fold one sample into a variable
    ///
    /// For scalar variables `value` has one component.
    pub fn add_value(&mut self, name: &str, value: &[f64]) -> Result<(), StatError> {
        self.add_batch(name, value, None, 1)
    }

    /// Fold one scalar sample into a variable
    pub fn add_scalar(&mut self, name: &str, value: f64) -> Result<(), StatError> {
        self.add_value(name, &[value])
    }

    /// Fold a batch of `n` samples with mean `value` into a variable
    ///
    /// `aux_sum_sq_dev` is the batch's own sum of squared deviations from
    /// `value`; `None` means zero. The variable is unchanged on error.
    pub fn add_batch(
        &mut self,
        name: &str,
        value: &[f64],
        aux_sum_sq_dev: Option<&[f64]>,
        n: u64,
    ) -> Result<(), StatError> {
        let record = self.record_mut(name)?;
        record
            .fold(value, aux_sum_sq_dev, n)
            .map_err(|e| e.for_variable(name))?;

        event!(trace, variable = name, n, count = record.count(), "folded batch");
        Ok(())
    }

    /// Fold a previously accumulated record into a variable
    pub fn combine(&mut self, name: &str, record: &Observable) -> Result<(), StatError> {
        self.record_mut(name)?
            .merge_in_place(record)
            .map_err(|e| e.for_variable(name))
    }

    /// Fold a sequence of samples into a variable, in order
    ///
    /// All-or-nothing: if any sample has the wrong length the variable is
    /// left as it was.
    pub fn add_samples<I, V>(&mut self, name: &str, values: I) -> Result<(), StatError>
    where
        I: IntoIterator<Item = V>,
        V: AsRef<[f64]>,
    {
        let record = self.record_mut(name)?;
        let mut scratch = record.clone();
        for value in values {
            scratch
                .push(value.as_ref())
                .map_err(|e| e.for_variable(name))?;
        }

        event!(
            trace,
            variable = name,
            added = scratch.count() - record.count(),
            "folded samples"
        );
        *record = scratch;
        Ok(())
    }

    /// Fold a sequence of scalar samples into a variable, in order
    pub fn add_scalars<I>(&mut self, name: &str, values: I) -> Result<(), StatError>
    where
        I: IntoIterator<Item = f64>,
    {
        self.add_samples(name, values.into_iter().map(|v| [v]))
    }

    /// Mean, dispersion and count of one variable
    pub fn get(&self, name: &str) -> Result<Estimate, StatError> {
        let record = self
            .observable(name)
            .ok_or_else(|| StatError::unknown(name))?;
        record
            .estimate()
            .ok_or_else(|| StatError::InsufficientSamples {
                name: name.into(),
                count: record.count(),
            })
    }

    /// Evaluate the named variables, in the order given
    pub fn evaluate<I, S>(&self, names: I) -> Result<Evaluation, StatError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names.into_iter();
        let mut evaluation = Evaluation::with_capacity(names.size_hint().0);
        for name in names {
            let name = name.as_ref();
            evaluation.push(name.into(), self.get(name)?);
        }
        Ok(evaluation)
    }

    /// Evaluate every variable, in declaration order
    pub fn evaluate_all(&self) -> Result<Evaluation, StatError> {
        self.evaluate(self.names())
    }

    fn check_same_variables(&self, other: &Self) -> Result<(), StatError> {
        let only_in_self: Vec<String> = self
            .names()
            .filter(|name| !other.contains(name))
            .map(String::from)
            .collect();
        let only_in_other: Vec<String> = other
            .names()
            .filter(|name| !self.contains(name))
            .map(String::from)
            .collect();

        if only_in_self.is_empty() && only_in_other.is_empty() {
            Ok(())
        } else {
            Err(StatError::VariableSetMismatch {
                only_in_self,
                only_in_other,
            })
        }
    }
}

impl Merge for Accumulator {
    type Error = StatError;

    /// Fold every record of `other` into the record of the same name
    ///
    /// Both accumulators must declare the same names with the same lengths,
    /// and no combined count may overflow. Everything is validated before
    /// the first record is touched.
    fn merge_in_place(&mut self, other: &Self) -> Result<(), StatError> {
        self.check_same_variables(other)?;

        let mut pairs = Vec::with_capacity(self.entries.len());
        for (i, (name, record)) in self.entries.iter().enumerate() {
            let j = other.index[name.as_str()];
            let incoming = &other.entries[j].1;
            record
                .shape()
                .check(incoming.shape().components())
                .map_err(|e| e.for_variable(name))?;
            record
                .checked_count(incoming.count())
                .map_err(|e| e.for_variable(name))?;
            pairs.push((i, j));
        }

        for (i, j) in pairs {
            let (name, record) = &mut self.entries[i];
            record
                .merge_in_place(&other.entries[j].1)
                .map_err(|e| e.for_variable(name))?;
        }

        event!(debug, variables = self.entries.len(), "merged accumulators");
        Ok(())
    }
}

impl<D: Into<Declaration>> FromIterator<D> for Accumulator {
    fn from_iter<I: IntoIterator<Item = D>>(declarations: I) -> Self {
        Self::from_declarations(declarations)
    }
}

impl From<Accumulator> for Vec<(String, Observable)> {
    fn from(stats: Accumulator) -> Self {
        stats.entries
    }
}

impl TryFrom<Vec<(String, Observable)>> for Accumulator {
    type Error = StatError;

    /// Rebuild from an ordered `(name, record)` list
    ///
    /// Unlike a declaration list, a stored list must not repeat a name; a
    /// repeat fails with [`StatError::DuplicateVariable`].
    fn try_from(entries: Vec<(String, Observable)>) -> Result<Self, StatError> {
        let mut stats = Self::new();
        for (name, record) in entries {
            if stats.contains(&name) {
                return Err(StatError::DuplicateVariable { name });
            }
            stats.insert(name, record);
        }
        Ok(stats)
    }
}

/// One line per variable: `name: mean ± dispersion (n = count)`
///
/// Variables with fewer than two samples show their mean only.
impl fmt::Display for Accumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, record)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{}: ", name)?;
            match record.estimate() {
                Some(estimate) => write!(f, "{}", estimate)?,
                None => {
                    write_components(f, record.shape(), record.mean())?;
                    write!(f, " (n = {}, insufficient samples)", record.count())?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concrete_scenario() {
        let mut stats = Accumulator::new();
        stats.declare_scalar("e").unwrap();
        stats.add_scalars("e", [1.0, 2.0, 3.0]).unwrap();

        let e = stats.get("e").unwrap();
        assert_eq!(e.mean(), &[2.0]);
        assert_eq!(e.dispersion(), &[1.0]);
        assert_eq!(e.count(), 3);
    }

    #[test]
    fn test_from_declarations() {
        let stats = Accumulator::from_declarations([
            Declaration::scalar("energy"),
            Declaration::vector("density", 3),
        ]);

        assert_eq!(stats.len(), 2);
        assert_eq!(stats.names().collect::<Vec<_>>(), vec!["energy", "density"]);
        assert_eq!(stats.shape("energy"), Some(Shape::Scalar));
        assert_eq!(stats.observable("density"), Some(&Observable::vector(3)));
        assert!(Accumulator::new().is_empty());
    }

    #[test]
    fn test_duplicate_declaration_keeps_first_position() {
        let stats: Accumulator = [("a", 1), ("b", 2), ("a", 3)].into_iter().collect();

        assert_eq!(stats.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(stats.shape("a"), Some(Shape::Vector(3)));
    }

    #[test]
    fn test_unknown_variable() {
        let mut stats = Accumulator::from_declarations(["x"]);
        let unknown = StatError::UnknownVariable { name: "y".into() };

        assert_eq!(stats.add_scalar("y", 1.0), Err(unknown.clone()));
        assert_eq!(stats.add_scalars("y", [1.0]), Err(unknown.clone()));
        assert_eq!(stats.remove_variable("y"), Err(unknown.clone()));
        assert_eq!(stats.reset_variable("y"), Err(unknown.clone()));
        assert_eq!(stats.get("y"), Err(unknown.clone()));
        assert_eq!(stats.evaluate(["x", "y"]).unwrap_err().variable(), Some("x"));
        assert_eq!(stats.combine("y", &Observable::scalar()), Err(unknown));
    }

    #[test]
    fn test_dimension_mismatch_is_atomic() {
        let mut stats = Accumulator::from_declarations([("g", 3)]);
        stats.add_value("g", &[1.0, 2.0, 3.0]).unwrap();
        let before = stats.clone();

        let err = stats.add_value("g", &[1.0, 2.0]).unwrap_err();
        assert_eq!(
            err,
            StatError::DimensionMismatch {
                name: "g".into(),
                expected: 3,
                found: 2
            }
        );

        let err = stats
            .add_samples("g", [vec![4.0, 5.0, 6.0], vec![7.0]])
            .unwrap_err();
        assert_eq!(err.variable(), Some("g"));
        assert_eq!(stats, before);
    }

    #[test]
    fn test_scalar_rejects_multi_component_value() {
        let mut stats = Accumulator::from_declarations(["e"]);
        let err = stats.add_value("e", &[1.0, 2.0]).unwrap_err();

        assert_eq!(
            err,
            StatError::DimensionMismatch {
                name: "e".into(),
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn test_insufficient_samples() {
        let mut stats = Accumulator::from_declarations(["e"]);
        assert_eq!(
            stats.get("e"),
            Err(StatError::InsufficientSamples {
                name: "e".into(),
                count: 0
            })
        );

        stats.add_scalar("e", 1.0).unwrap();
        assert_eq!(
            stats.evaluate_all(),
            Err(StatError::InsufficientSamples {
                name: "e".into(),
                count: 1
            })
        );
    }

    #[test]
    fn test_remove_returns_record() {
        let mut stats = Accumulator::from_declarations(["a", "b", "c"]);
        stats.add_scalars("b", [2.0, 4.0]).unwrap();

        let removed = stats.remove_variable("b").unwrap();
        assert_eq!(removed.into_parts(), (vec![3.0], vec![2.0], 2));

        assert!(!stats.contains("b"));
        assert_eq!(stats.names().collect::<Vec<_>>(), vec!["a", "c"]);

        // Positions after the removed entry must still resolve
        stats.add_scalar("c", 5.0).unwrap();
        assert_eq!(stats.observable("c").unwrap().mean(), &[5.0]);
    }

    #[test]
    fn test_reset_preserves_length() {
        let mut stats = Accumulator::from_declarations([("g", 4)]);
        stats.add_value("g", &[1.0, 2.0, 3.0, 4.0]).unwrap();

        stats.reset_variable("g").unwrap();
        assert_eq!(stats.observable("g"), Some(&Observable::vector(4)));
    }

    #[test]
    fn test_redeclare_resets_but_keeps_shape() {
        let mut stats = Accumulator::from_declarations([("g", 2)]);
        stats.add_value("g", &[1.0, 2.0]).unwrap();

        stats.declare_vector("g", 2).unwrap();
        assert!(stats.observable("g").unwrap().is_empty());

        let err = stats.declare_vector("g", 5).unwrap_err();
        assert_eq!(
            err,
            StatError::DimensionMismatch {
                name: "g".into(),
                expected: 2,
                found: 5
            }
        );

        // A removed name may come back with another shape
        stats.remove_variable("g").unwrap();
        stats.declare_vector("g", 5).unwrap();
        assert_eq!(stats.shape("g"), Some(Shape::Vector(5)));
    }

    #[test]
    fn test_set_variable_explicit_values() {
        let mut stats = Accumulator::new();
        stats
            .set_variable("e", Observable::from_scalar(2.0, 2.0, 3).unwrap())
            .unwrap();

        let e = stats.get("e").unwrap();
        assert_eq!(e.scalar(), Some((2.0, 1.0)));
    }

    #[test]
    fn test_add_batch() {
        let mut stats = Accumulator::from_declarations(["e"]);
        stats.add_scalars("e", [1.0, 2.0, 3.0]).unwrap();
        // [4, 6]: mean 5, sum of squared deviations 2
        stats.add_batch("e", &[5.0], Some(&[2.0][..]), 2).unwrap();

        let mut reference = Accumulator::from_declarations(["e"]);
        reference.add_scalars("e", [1.0, 2.0, 3.0, 4.0, 6.0]).unwrap();

        let (mean, dispersion) = stats.get("e").unwrap().scalar().unwrap();
        let (ref_mean, ref_dispersion) = reference.get("e").unwrap().scalar().unwrap();
        assert!((mean - ref_mean).abs() < 1e-12);
        assert!((dispersion - ref_dispersion).abs() < 1e-12);
    }

    #[test]
    fn test_combine_record() {
        let mut stats = Accumulator::from_declarations([("g", 2)]);
        stats.add_value("g", &[0.0, 0.0]).unwrap();

        let saved = Observable::from_vector(vec![2.0, 4.0], vec![0.0, 0.0], 1).unwrap();
        stats.combine("g", &saved).unwrap();
        assert_eq!(stats.observable("g").unwrap().mean(), &[1.0, 2.0]);
        assert_eq!(stats.observable("g").unwrap().count(), 2);

        let err = stats.combine("g", &Observable::vector(3)).unwrap_err();
        assert_eq!(err.variable(), Some("g"));
    }

    #[test]
    fn test_evaluate_order_follows_request() {
        let mut stats = Accumulator::from_declarations(["a", "b"]);
        stats.add_scalars("a", [1.0, 3.0]).unwrap();
        stats.add_scalars("b", [10.0, 30.0]).unwrap();

        let evaluation = stats.evaluate(["b", "a"]).unwrap();
        assert_eq!(evaluation.names().collect::<Vec<_>>(), vec!["b", "a"]);

        let all = stats.evaluate_all().unwrap();
        assert_eq!(all.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(all.get("b").unwrap().mean(), &[20.0]);
    }

    #[test]
    fn test_merge_set_mismatch() {
        let a = Accumulator::from_declarations(["x", "y"]);
        let b = Accumulator::from_declarations(["x", "z"]);

        assert_eq!(
            a.merge(&b),
            Err(StatError::VariableSetMismatch {
                only_in_self: vec!["y".into()],
                only_in_other: vec!["z".into()],
            })
        );
    }

    #[test]
    fn test_merge_length_mismatch_is_atomic() {
        let mut a = Accumulator::from_declarations([("p", 1), ("q", 2)]);
        let b = Accumulator::from_declarations([("p", 1), ("q", 3)]);
        a.add_value("p", &[1.0]).unwrap();
        let before = a.clone();

        let err = a.merge_in_place(&b).unwrap_err();
        assert_eq!(err.variable(), Some("q"));
        assert_eq!(a, before);
    }

    #[test]
    fn test_batch_count_overflow_is_rejected() {
        let mut stats = Accumulator::from_declarations(["e"]);
        stats.add_scalar("e", 1.0).unwrap();
        let before = stats.clone();

        let err = stats.add_batch("e", &[2.0], None, u64::MAX).unwrap_err();
        assert_eq!(
            err,
            StatError::CountOverflow {
                name: "e".into(),
                count: 1,
                added: u64::MAX
            }
        );
        assert_eq!(stats, before);
    }

    #[test]
    fn test_merge_count_overflow_is_atomic() {
        let mut a = Accumulator::from_declarations(["p", "q"]);
        a.add_scalars("p", [1.0, 2.0]).unwrap();
        a.add_scalar("q", 1.0).unwrap();
        let before = a.clone();

        let mut b = Accumulator::from_declarations(["p", "q"]);
        b.add_scalars("p", [3.0, 4.0]).unwrap();
        b.set_variable("q", Observable::from_scalar(0.0, 0.0, u64::MAX).unwrap())
            .unwrap();

        let err = a.merge_in_place(&b).unwrap_err();
        assert_eq!(err.variable(), Some("q"));
        assert!(matches!(err, StatError::CountOverflow { .. }));
        // "p" precedes "q" and must not have been merged
        assert_eq!(a, before);
    }

    #[test]
    fn test_negative_batch_sum_sq_dev_is_rejected() {
        let mut stats = Accumulator::from_declarations(["e"]);
        stats.add_scalars("e", [1.0, 2.0]).unwrap();
        let before = stats.clone();

        let err = stats
            .add_batch("e", &[3.0], Some(&[-4.0][..]), 2)
            .unwrap_err();
        assert_eq!(
            err,
            StatError::NegativeSumSqDev {
                name: "e".into(),
                component: 0
            }
        );
        assert_eq!(stats, before);
    }

    #[test]
    fn test_duplicate_entry_list_is_rejected() {
        let entries = vec![
            ("e".to_string(), Observable::scalar()),
            ("e".to_string(), Observable::vector(2)),
        ];

        assert_eq!(
            Accumulator::try_from(entries),
            Err(StatError::DuplicateVariable { name: "e".into() })
        );
    }

    #[test]
    fn test_merge_does_not_mutate_inputs() {
        let mut a = Accumulator::from_declarations(["x"]);
        let mut b = Accumulator::from_declarations(["x"]);
        a.add_scalars("x", [1.0, 2.0]).unwrap();
        b.add_scalars("x", [3.0, 4.0]).unwrap();
        let (a0, b0) = (a.clone(), b.clone());

        let merged = a.merge(&b).unwrap();
        assert_eq!(a, a0);
        assert_eq!(b, b0);
        assert_eq!(merged.observable("x").unwrap().count(), 4);
        assert_eq!(merged.observable("x").unwrap().mean(), &[2.5]);
    }

    #[test]
    fn test_merge_ignores_declaration_order() {
        let mut a = Accumulator::from_declarations(["x", "y"]);
        let mut b = Accumulator::from_declarations(["y", "x"]);
        a.add_scalar("x", 1.0).unwrap();
        b.add_scalar("x", 3.0).unwrap();

        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.names().collect::<Vec<_>>(), vec!["x", "y"]);
        assert_eq!(merged.observable("x").unwrap().mean(), &[2.0]);
    }

    #[test]
    fn test_merge_all() {
        let parts = (0..4).map(|k| {
            let mut part = Accumulator::from_declarations(["e"]);
            part.add_scalar("e", k as f64).unwrap();
            part
        });

        let combined = Accumulator::merge_all(parts).unwrap().unwrap();
        assert_eq!(combined.observable("e").unwrap().count(), 4);
        assert_eq!(combined.observable("e").unwrap().mean(), &[1.5]);

        assert_eq!(Accumulator::merge_all(Vec::new()), Ok(None));
    }

    #[test]
    fn test_display() {
        let mut stats = Accumulator::from_declarations([
            Declaration::scalar("e"),
            Declaration::vector("g", 2),
        ]);
        stats.add_scalars("e", [1.0, 2.0, 3.0]).unwrap();
        stats.add_value("g", &[0.5, 1.5]).unwrap();

        assert_eq!(
            stats.to_string(),
            "e: 2 ± 1 (n = 3)\ng: [0.5, 1.5] (n = 1, insufficient samples)"
        );
    }
}
