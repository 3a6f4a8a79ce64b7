//! Standard normal distribution functions.
//!
//! Used by the `normalCdf`, `normalPdf` and `black` script built-ins and by
//! the reverse sweep of the computation graph, so eager and graph evaluation
//! share one implementation.

const FRAC_1_SQRT_2PI: f64 = 0.398_942_280_401_432_7;

/// Complementary error function, Abramowitz and Stegun 7.1.26.
///
/// Absolute error below 1.5e-7.
#[inline]
fn erfc(x: f64) -> f64 {
    const A1: f64 = 0.254_829_592;
    const A2: f64 = -0.284_496_736;
    const A3: f64 = 1.421_413_741;
    const A4: f64 = -1.453_152_027;
    const A5: f64 = 1.061_405_429;
    const P: f64 = 0.327_591_1;

    let z = x.abs();
    let t = 1.0 / (1.0 + P * z);
    let tail = t * (A1 + t * (A2 + t * (A3 + t * (A4 + t * A5)))) * (-z * z).exp();
    if x < 0.0 {
        2.0 - tail
    } else {
        tail
    }
}

/// Standard normal cumulative distribution function Φ(x).
///
/// # Examples
///
/// ```
/// use pricer_core::math::distributions::norm_cdf;
///
/// assert!((norm_cdf(0.0) - 0.5).abs() < 1e-7);
/// assert!((norm_cdf(1.0) - 0.841_344_746).abs() < 1e-7);
/// ```
#[inline]
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Standard normal probability density function φ(x).
#[inline]
pub fn norm_pdf(x: f64) -> f64 {
    FRAC_1_SQRT_2PI * (-0.5 * x * x).exp()
}

/// Undiscounted Black formula.
///
/// `omega` is `1.0` for a call and `-1.0` for a put; `std_dev` is
/// `sigma * sqrt(T)`. A zero standard deviation returns intrinsic value.
///
/// # Examples
///
/// ```
/// use pricer_core::math::distributions::black_formula;
///
/// // at-the-money call, 20% vol, one year
/// let value = black_formula(1.0, 100.0, 100.0, 0.2);
/// assert!((value - 7.965_567).abs() < 1e-4);
///
/// assert_eq!(black_formula(-1.0, 90.0, 100.0, 0.0), 10.0);
/// ```
pub fn black_formula(omega: f64, strike: f64, forward: f64, std_dev: f64) -> f64 {
    if std_dev <= 0.0 || strike <= 0.0 || forward <= 0.0 {
        return (omega * (forward - strike)).max(0.0);
    }
    let d1 = ((forward / strike).ln() + 0.5 * std_dev * std_dev) / std_dev;
    let d2 = d1 - std_dev;
    omega * (forward * norm_cdf(omega * d1) - strike * norm_cdf(omega * d2))
}
