//! Discount curve abstractions.
//!
//! - [`YieldCurve`]: discount factors by year fraction
//! - [`FlatCurve`]: constant rate curve
//! - [`InterpolatedCurve`]: log-linear pillar curve
//! - [`CurveEnum`]: static dispatch over the concrete curves
//! - [`CurveSpec`]: configuration form of a curve

mod curve_enum;
mod flat;
mod interpolated;
mod traits;

pub use curve_enum::{CurveEnum, CurveSpec};
pub use flat::FlatCurve;
pub use interpolated::InterpolatedCurve;
pub use traits::YieldCurve;
