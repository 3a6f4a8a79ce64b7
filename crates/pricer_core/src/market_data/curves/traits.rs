//! Yield curve trait definition.

use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Discount curve queried by year fraction from the curve's reference date.
///
/// Implementations provide `discount_factor`; zero and forward rates follow
/// from it. Rates are continuously compounded.
pub trait YieldCurve<T: Float> {
    /// Discount factor `P(0, t)`; `t` must be non-negative.
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError>;

    /// Zero rate `-ln P(0, t) / t` for `t > 0`.
    fn zero_rate(&self, t: T) -> Result<T, MarketDataError> {
        if t <= T::zero() {
            return Err(MarketDataError::InvalidMaturity {
                t: t.to_f64().unwrap_or(0.0),
            });
        }
        Ok(-self.discount_factor(t)?.ln() / t)
    }

    /// Forward discount factor `P(0, t2) / P(0, t1)`.
    fn forward_discount(&self, t1: T, t2: T) -> Result<T, MarketDataError> {
        Ok(self.discount_factor(t2)? / self.discount_factor(t1)?)
    }
}
