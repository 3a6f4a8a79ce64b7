//! # pricer_core: Foundation for the Payoff Scripting Engine
//!
//! ## Layer 1 (Foundation) Role
//!
//! pricer_core is the bottom layer of the workspace and provides:
//! - Time types: `Date`, `DayCountConvention`, `Tenor` (`types::time`)
//! - Currency types: `Currency` (`types::currency`)
//! - Discount curves: `FlatCurve`, `InterpolatedCurve`, `CurveEnum` (`market_data`)
//! - Normal distribution, Black formula and path regression (`math`)
//! - Vectorised path values: `PathVector`, `BoolVector` and their
//!   graph-capable wrappers `RandomVariable` and `Filter` (`vectorized`)
//! - Computation graphs with forward evaluation and adjoint sensitivities
//!   (`graph`)
//!
//! ## Dependencies
//!
//! Layer 1 has no dependencies on other pricer_* crates:
//! - num-traits: generic floating point curves
//! - nalgebra: SVD for least-squares regression
//! - chrono: date arithmetic
//! - thiserror: error enums
//! - serde: serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use pricer_core::types::{Currency, Date, DayCountConvention};
//! use pricer_core::vectorized::PathVector;
//!
//! let start = Date::from_ymd(2024, 1, 1).unwrap();
//! let end = Date::from_ymd(2025, 1, 1).unwrap();
//! let t = DayCountConvention::ActualActual365.year_fraction_dates(start, end);
//! assert!((t - 366.0 / 365.0).abs() < 1e-12);
//!
//! assert_eq!(Currency::EUR.code(), "EUR");
//!
//! let spot = PathVector::from_paths(vec![90.0, 110.0]);
//! let payoff = spot.map(|s| (s - 100.0).max(0.0));
//! assert_eq!(payoff.expectation(), 5.0);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialisation for dates, currencies, curve specs and
//!   graph snapshots

#![warn(missing_docs)]

pub mod graph;
pub mod market_data;
pub mod math;
pub mod types;
pub mod vectorized;
