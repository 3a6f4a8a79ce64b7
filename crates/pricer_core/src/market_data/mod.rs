//! Market data structures consumed by the scripting models.
//!
//! Discount curves are generic over `T: Float` and queried by year fraction;
//! the models convert script dates to year fractions with ACT/365 from the
//! market reference date.
//!
//! # Example
//!
//! ```
//! use pricer_core::market_data::curves::{YieldCurve, FlatCurve};
//!
//! let curve = FlatCurve::new(0.05_f64);
//! let df = curve.discount_factor(1.0).unwrap();
//! assert!((df - 0.951229).abs() < 1e-5);
//! ```

pub mod curves;
pub mod error;

pub use curves::{CurveEnum, CurveSpec, FlatCurve, InterpolatedCurve, YieldCurve};
pub use error::MarketDataError;
