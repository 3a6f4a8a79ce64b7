//! Per-path booleans.

use std::borrow::Cow;

use super::path_vector::{check_sizes, Lanes};
use super::{PathVector, VectorError};

/// One boolean per Monte Carlo path.
///
/// # Examples
///
/// ```
/// use pricer_core::vectorized::BoolVector;
///
/// let a = BoolVector::from_paths(vec![true, false, true]);
/// let b = BoolVector::deterministic(3, true);
/// assert_eq!(a.and(&b).unwrap().count(), 2);
/// assert!(!a.all());
/// assert!(a.not().any());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BoolVector {
    size: usize,
    lanes: Lanes<bool>,
}

impl BoolVector {
    /// The same flag on `size` paths.
    #[inline]
    pub fn deterministic(size: usize, value: bool) -> Self {
        Self {
            size,
            lanes: Lanes::Scalar(value),
        }
    }

    /// One flag per path.
    #[inline]
    pub fn from_paths(values: Vec<bool>) -> Self {
        Self {
            size: values.len(),
            lanes: Lanes::Paths(values),
        }
    }

    pub(crate) fn from_lanes(size: usize, lanes: Lanes<bool>) -> Self {
        Self { size, lanes }
    }

    /// Number of paths.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the filter was built as a single broadcast flag.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        matches!(self.lanes, Lanes::Scalar(_))
    }

    /// The broadcast flag of a deterministic filter.
    #[inline]
    pub fn deterministic_value(&self) -> Option<bool> {
        match self.lanes {
            Lanes::Scalar(v) => Some(v),
            Lanes::Paths(_) => None,
        }
    }

    /// Flag on one path.
    #[inline]
    pub fn at(&self, path: usize) -> bool {
        self.lanes.at(path)
    }

    /// All lanes.
    #[inline]
    pub fn values(&self) -> Cow<'_, [bool]> {
        self.lanes.values(self.size)
    }

    /// Lane-wise conjunction.
    pub fn and(&self, other: &Self) -> Result<Self, VectorError> {
        let size = check_sizes(self.size, other.size)?;
        Ok(Self::from_lanes(
            size,
            self.lanes.zip_with(&other.lanes, size, |a, b| a && b),
        ))
    }

    /// Lane-wise disjunction.
    pub fn or(&self, other: &Self) -> Result<Self, VectorError> {
        let size = check_sizes(self.size, other.size)?;
        Ok(Self::from_lanes(
            size,
            self.lanes.zip_with(&other.lanes, size, |a, b| a || b),
        ))
    }

    /// Lane-wise negation.
    pub fn not(&self) -> Self {
        Self::from_lanes(self.size, self.lanes.map_with(|a| !a))
    }

    /// Number of paths where the flag is set.
    pub fn count(&self) -> usize {
        match &self.lanes {
            Lanes::Scalar(true) => self.size,
            Lanes::Scalar(false) => 0,
            Lanes::Paths(v) => v.iter().filter(|f| **f).count(),
        }
    }

    /// Whether every path is set.
    pub fn all(&self) -> bool {
        self.count() == self.size
    }

    /// Whether any path is set.
    pub fn any(&self) -> bool {
        self.count() > 0
    }

    /// `1.0` where set, `0.0` elsewhere.
    pub fn to_indicator(&self) -> PathVector {
        PathVector::from_lanes(
            self.size,
            self.lanes.map_with(|a| if a { 1.0 } else { 0.0 }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_logic_stays_compact() {
        let t = BoolVector::deterministic(4, true);
        let f = BoolVector::deterministic(4, false);
        assert_eq!(t.and(&f).unwrap().deterministic_value(), Some(false));
        assert_eq!(t.or(&f).unwrap().deterministic_value(), Some(true));
        assert_eq!(f.not().deterministic_value(), Some(true));
    }

    #[test]
    fn test_indicator() {
        let b = BoolVector::from_paths(vec![true, false]);
        assert_eq!(b.to_indicator().values().as_ref(), &[1.0, 0.0]);
    }

    #[test]
    fn test_size_mismatch() {
        let a = BoolVector::deterministic(2, true);
        let b = BoolVector::deterministic(3, true);
        assert!(a.or(&b).is_err());
    }
}
