//! Pillar-based yield curve with log-linear discount factor interpolation.

use super::YieldCurve;
use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Yield curve built from zero rates at pillar times.
///
/// Log discount factors are interpolated linearly between pillars, which
/// gives piecewise-flat instantaneous forwards. Before the first pillar the
/// first zero rate applies, after the last pillar the last forward is
/// extended.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::{InterpolatedCurve, YieldCurve};
///
/// let curve = InterpolatedCurve::new(&[1.0, 2.0], &[0.02, 0.03]).unwrap();
/// let df = curve.discount_factor(1.5).unwrap();
/// assert!((df - (-0.02_f64 * 0.5 - 0.06 * 0.5).exp()).abs() < 1e-14);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedCurve<T: Float> {
    times: Vec<T>,
    log_dfs: Vec<T>,
}

impl<T: Float> InterpolatedCurve<T> {
    /// Build a curve from pillar times (strictly increasing, positive) and
    /// continuously compounded zero rates.
    pub fn new(times: &[T], zero_rates: &[T]) -> Result<Self, MarketDataError> {
        if times.is_empty() {
            return Err(MarketDataError::InsufficientData { got: 0, need: 1 });
        }
        if times.len() != zero_rates.len() {
            return Err(MarketDataError::InsufficientData {
                got: zero_rates.len(),
                need: times.len(),
            });
        }
        if times[0] <= T::zero() {
            return Err(MarketDataError::InvalidMaturity {
                t: times[0].to_f64().unwrap_or(0.0),
            });
        }
        for w in times.windows(2) {
            if w[1] <= w[0] {
                return Err(MarketDataError::NonMonotonicPillars {
                    previous: w[0].to_f64().unwrap_or(0.0),
                    next: w[1].to_f64().unwrap_or(0.0),
                });
            }
        }

        Ok(Self {
            times: times.to_vec(),
            log_dfs: times
                .iter()
                .zip(zero_rates)
                .map(|(&t, &r)| -r * t)
                .collect(),
        })
    }

    /// Pillar times.
    #[inline]
    pub fn times(&self) -> &[T] {
        &self.times
    }

    fn log_discount(&self, t: T) -> T {
        let n = self.times.len();
        if t <= self.times[0] {
            return self.log_dfs[0] / self.times[0] * t;
        }
        if t >= self.times[n - 1] {
            if n == 1 {
                return self.log_dfs[0] / self.times[0] * t;
            }
            let slope = (self.log_dfs[n - 1] - self.log_dfs[n - 2])
                / (self.times[n - 1] - self.times[n - 2]);
            return self.log_dfs[n - 1] + slope * (t - self.times[n - 1]);
        }
        // first pillar strictly above t
        let hi = self.times.partition_point(|&x| x <= t);
        let lo = hi - 1;
        let w = (t - self.times[lo]) / (self.times[hi] - self.times[lo]);
        self.log_dfs[lo] + w * (self.log_dfs[hi] - self.log_dfs[lo])
    }
}

impl<T: Float> YieldCurve<T> for InterpolatedCurve<T> {
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError> {
        if t < T::zero() {
            return Err(MarketDataError::InvalidMaturity {
                t: t.to_f64().unwrap_or(0.0),
            });
        }
        Ok(self.log_discount(t).exp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reprices_pillars() {
        let curve = InterpolatedCurve::new(&[0.5, 1.0, 5.0], &[0.01, 0.015, 0.025]).unwrap();
        for (&t, r) in [0.5, 1.0, 5.0].iter().zip([0.01, 0.015, 0.025]) {
            assert_relative_eq!(curve.zero_rate(t).unwrap(), r, epsilon = 1e-14);
        }
    }

    #[test]
    fn test_short_end_uses_first_rate() {
        let curve = InterpolatedCurve::new(&[1.0, 2.0], &[0.02, 0.03]).unwrap();
        assert_relative_eq!(curve.zero_rate(0.25).unwrap(), 0.02, epsilon = 1e-14);
        assert_eq!(curve.discount_factor(0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_long_end_extends_last_forward() {
        let curve = InterpolatedCurve::new(&[1.0, 2.0], &[0.02, 0.03]).unwrap();
        // forward between 1Y and 2Y is 4%
        let df3 = curve.discount_factor(3.0).unwrap();
        assert_relative_eq!(df3, (-0.06_f64 - 0.04).exp(), epsilon = 1e-14);
    }

    #[test]
    fn test_rejects_unsorted_pillars() {
        let result = InterpolatedCurve::new(&[2.0, 1.0], &[0.02, 0.03]);
        assert!(matches!(
            result,
            Err(MarketDataError::NonMonotonicPillars { .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_lengths() {
        let result = InterpolatedCurve::new(&[1.0, 2.0], &[0.02]);
        assert!(matches!(result, Err(MarketDataError::InsufficientData { .. })));
    }
}
