//! Static dispatch over concrete curve implementations.
//!
//! - [`CurveEnum`]: wraps `FlatCurve` and `InterpolatedCurve`
//! - [`CurveSpec`]: serialisable description used by configuration files

use super::{FlatCurve, InterpolatedCurve, YieldCurve};
use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Static dispatch enum for yield curves.
///
/// # Example
///
/// ```
/// use pricer_core::market_data::curves::{CurveEnum, YieldCurve};
///
/// let curve = CurveEnum::flat(0.02_f64);
/// assert!((curve.discount_factor(1.0).unwrap() - (-0.02_f64).exp()).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CurveEnum<T: Float> {
    /// Constant rate curve.
    Flat(FlatCurve<T>),
    /// Pillar-based curve.
    Interpolated(InterpolatedCurve<T>),
}

impl<T: Float> CurveEnum<T> {
    /// Flat curve shortcut.
    #[inline]
    pub fn flat(rate: T) -> Self {
        CurveEnum::Flat(FlatCurve::new(rate))
    }
}

impl<T: Float> YieldCurve<T> for CurveEnum<T> {
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError> {
        match self {
            CurveEnum::Flat(curve) => curve.discount_factor(t),
            CurveEnum::Interpolated(curve) => curve.discount_factor(t),
        }
    }
}

impl<T: Float> From<FlatCurve<T>> for CurveEnum<T> {
    fn from(curve: FlatCurve<T>) -> Self {
        CurveEnum::Flat(curve)
    }
}

impl<T: Float> From<InterpolatedCurve<T>> for CurveEnum<T> {
    fn from(curve: InterpolatedCurve<T>) -> Self {
        CurveEnum::Interpolated(curve)
    }
}

/// Configuration form of a discount curve.
///
/// In TOML either `{ flat = 0.02 }` or
/// `{ times = [1.0, 2.0], zero_rates = [0.02, 0.025] }`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum CurveSpec {
    /// Constant zero rate.
    Flat {
        /// Continuously compounded rate.
        flat: f64,
    },
    /// Zero rates at pillar times.
    Pillars {
        /// Pillar times in years.
        times: Vec<f64>,
        /// Zero rates at the pillars.
        zero_rates: Vec<f64>,
    },
}

impl CurveSpec {
    /// Builds the described curve.
    pub fn build(&self) -> Result<CurveEnum<f64>, MarketDataError> {
        match self {
            CurveSpec::Flat { flat } => Ok(CurveEnum::flat(*flat)),
            CurveSpec::Pillars { times, zero_rates } => {
                Ok(InterpolatedCurve::new(times, zero_rates)?.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_matches_inner_curve() {
        let inner = InterpolatedCurve::new(&[1.0, 3.0], &[0.01, 0.02]).unwrap();
        let wrapped: CurveEnum<f64> = inner.clone().into();
        for t in [0.0, 0.5, 2.0, 10.0] {
            assert_eq!(
                wrapped.discount_factor(t).unwrap(),
                inner.discount_factor(t).unwrap()
            );
        }
    }

    #[test]
    fn test_spec_build_pillars_validates() {
        let spec = CurveSpec::Pillars {
            times: vec![1.0],
            zero_rates: vec![],
        };
        assert!(spec.build().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_spec_from_toml() {
        #[derive(serde::Deserialize)]
        struct Holder {
            eur: CurveSpec,
            usd: CurveSpec,
        }
        let holder: Holder = toml::from_str(
            "eur = { flat = 0.02 }\nusd = { times = [1.0, 2.0], zero_rates = [0.03, 0.035] }",
        )
        .unwrap();
        assert_eq!(holder.eur, CurveSpec::Flat { flat: 0.02 });
        assert!(matches!(holder.usd.build().unwrap(), CurveEnum::Interpolated(_)));
    }
}
