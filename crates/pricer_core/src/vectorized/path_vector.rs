//! Per-path `f64` storage.

use std::borrow::Cow;

use super::{BoolVector, Comparison, VectorError};

/// Lane storage shared by [`PathVector`] and [`BoolVector`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Lanes<T> {
    /// One value broadcast to every path.
    Scalar(T),
    /// One value per path.
    Paths(Vec<T>),
}

impl<T: Copy> Lanes<T> {
    #[inline]
    pub(crate) fn at(&self, path: usize) -> T {
        match self {
            Lanes::Scalar(v) => *v,
            Lanes::Paths(v) => v[path],
        }
    }

    pub(crate) fn zip_with<U: Copy, R>(
        &self,
        other: &Lanes<U>,
        size: usize,
        f: impl Fn(T, U) -> R,
    ) -> Lanes<R> {
        match (self, other) {
            (Lanes::Scalar(a), Lanes::Scalar(b)) => Lanes::Scalar(f(*a, *b)),
            _ => Lanes::Paths((0..size).map(|i| f(self.at(i), other.at(i))).collect()),
        }
    }

    pub(crate) fn map_with<R>(&self, f: impl Fn(T) -> R) -> Lanes<R> {
        match self {
            Lanes::Scalar(v) => Lanes::Scalar(f(*v)),
            Lanes::Paths(v) => Lanes::Paths(v.iter().map(|x| f(*x)).collect()),
        }
    }

    pub(crate) fn values(&self, size: usize) -> Cow<'_, [T]> {
        match self {
            Lanes::Scalar(v) => Cow::Owned(vec![*v; size]),
            Lanes::Paths(v) => Cow::Borrowed(v.as_slice()),
        }
    }
}

pub(crate) fn check_sizes(left: usize, right: usize) -> Result<usize, VectorError> {
    if left != right {
        return Err(VectorError::SizeMismatch { left, right });
    }
    Ok(left)
}

/// One `f64` per Monte Carlo path.
///
/// A vector built with [`PathVector::deterministic`] stores a single value
/// and stays compact through arithmetic with other deterministic vectors;
/// determinism is structural, never inferred from equal lane values.
///
/// # Examples
///
/// ```
/// use pricer_core::vectorized::PathVector;
///
/// let a = PathVector::deterministic(3, 2.0);
/// let b = PathVector::from_paths(vec![1.0, 2.0, 3.0]);
/// let c = a.zip_map(&b, |x, y| x * y).unwrap();
///
/// assert!(a.is_deterministic());
/// assert!(!c.is_deterministic());
/// assert_eq!(c.values().as_ref(), &[2.0, 4.0, 6.0]);
/// assert_eq!(c.expectation(), 4.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PathVector {
    size: usize,
    lanes: Lanes<f64>,
}

impl PathVector {
    /// The same value on `size` paths.
    #[inline]
    pub fn deterministic(size: usize, value: f64) -> Self {
        Self {
            size,
            lanes: Lanes::Scalar(value),
        }
    }

    /// One value per path.
    #[inline]
    pub fn from_paths(values: Vec<f64>) -> Self {
        Self {
            size: values.len(),
            lanes: Lanes::Paths(values),
        }
    }

    pub(crate) fn from_lanes(size: usize, lanes: Lanes<f64>) -> Self {
        Self { size, lanes }
    }

    /// Number of paths.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Whether the vector was built as a single broadcast value.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        matches!(self.lanes, Lanes::Scalar(_))
    }

    /// The broadcast value of a deterministic vector.
    #[inline]
    pub fn deterministic_value(&self) -> Option<f64> {
        match self.lanes {
            Lanes::Scalar(v) => Some(v),
            Lanes::Paths(_) => None,
        }
    }

    /// Value on one path.
    ///
    /// # Panics
    ///
    /// Panics if `path >= size()` for a stochastic vector.
    #[inline]
    pub fn at(&self, path: usize) -> f64 {
        self.lanes.at(path)
    }

    /// All lanes; borrowed unless the vector is deterministic.
    #[inline]
    pub fn values(&self) -> Cow<'_, [f64]> {
        self.lanes.values(self.size)
    }

    /// Consumes the vector into one value per path.
    pub fn into_values(self) -> Vec<f64> {
        match self.lanes {
            Lanes::Scalar(v) => vec![v; self.size],
            Lanes::Paths(v) => v,
        }
    }

    /// Applies `f` lane by lane.
    #[inline]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::from_lanes(self.size, self.lanes.map_with(f))
    }

    /// Combines two vectors lane by lane.
    ///
    /// # Errors
    ///
    /// `SizeMismatch` if the path counts differ.
    pub fn zip_map(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Result<Self, VectorError> {
        let size = check_sizes(self.size, other.size)?;
        Ok(Self::from_lanes(size, self.lanes.zip_with(&other.lanes, size, f)))
    }

    /// Lane-wise comparison.
    pub fn compare(&self, other: &Self, cmp: Comparison) -> Result<BoolVector, VectorError> {
        let size = check_sizes(self.size, other.size)?;
        Ok(BoolVector::from_lanes(
            size,
            self.lanes.zip_with(&other.lanes, size, |a, b| cmp.holds(a, b)),
        ))
    }

    /// `then` where `filter` holds, `otherwise` elsewhere.
    ///
    /// A deterministic filter returns one of the operands unchanged.
    pub fn select(filter: &BoolVector, then: &Self, otherwise: &Self) -> Result<Self, VectorError> {
        let size = check_sizes(then.size, otherwise.size)?;
        check_sizes(filter.size(), size)?;
        if let Some(flag) = filter.deterministic_value() {
            return Ok(if flag { then.clone() } else { otherwise.clone() });
        }
        Ok(Self::from_paths(
            (0..size)
                .map(|i| {
                    if filter.at(i) {
                        then.at(i)
                    } else {
                        otherwise.at(i)
                    }
                })
                .collect(),
        ))
    }

    /// Lanes above one half, for vectors carrying 0/1 indicators.
    pub fn truthy(&self) -> BoolVector {
        BoolVector::from_lanes(self.size, self.lanes.map_with(|v| v > 0.5))
    }

    /// Cross-path mean.
    pub fn expectation(&self) -> f64 {
        match &self.lanes {
            Lanes::Scalar(v) => *v,
            Lanes::Paths(v) if v.is_empty() => 0.0,
            Lanes::Paths(v) => v.iter().sum::<f64>() / v.len() as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_stays_compact() {
        let a = PathVector::deterministic(1000, 1.5);
        let b = PathVector::deterministic(1000, 2.0);
        let c = a.zip_map(&b, |x, y| x + y).unwrap();
        assert_eq!(c.deterministic_value(), Some(3.5));
        assert_eq!(c.size(), 1000);
    }

    #[test]
    fn test_size_mismatch() {
        let a = PathVector::deterministic(3, 1.0);
        let b = PathVector::from_paths(vec![1.0, 2.0]);
        assert_eq!(
            a.zip_map(&b, |x, y| x + y),
            Err(VectorError::SizeMismatch { left: 3, right: 2 })
        );
    }

    #[test]
    fn test_select_per_lane() {
        let filter = BoolVector::from_paths(vec![true, false]);
        let then = PathVector::from_paths(vec![1.0, 2.0]);
        let otherwise = PathVector::deterministic(2, -1.0);
        let result = PathVector::select(&filter, &then, &otherwise).unwrap();
        assert_eq!(result.values().as_ref(), &[1.0, -1.0]);
    }

    #[test]
    fn test_select_deterministic_filter_keeps_shape() {
        let filter = BoolVector::deterministic(2, false);
        let then = PathVector::from_paths(vec![1.0, 2.0]);
        let otherwise = PathVector::deterministic(2, -1.0);
        let result = PathVector::select(&filter, &then, &otherwise).unwrap();
        assert!(result.is_deterministic());
    }

    #[test]
    fn test_truthy() {
        let v = PathVector::from_paths(vec![0.0, 1.0, 0.3, 0.9]);
        assert_eq!(v.truthy().values().as_ref(), &[false, true, false, true]);
    }
}
