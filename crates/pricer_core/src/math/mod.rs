//! Numerical building blocks.
//!
//! - [`distributions`]: standard normal CDF/PDF and the Black formula
//! - [`regression`]: polynomial least-squares regression across paths

pub mod distributions;
pub mod regression;

pub use distributions::{black_formula, norm_cdf, norm_pdf};
pub use regression::{PolynomialBasis, RegressionError, RegressionFit};
