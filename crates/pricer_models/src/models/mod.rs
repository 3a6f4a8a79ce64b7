//! Numerical model backends behind script evaluation.
//!
//! All backends implement [`Model`]:
//!
//! - [`BlackScholesModel`]: correlated lognormal equity and FX diffusion on
//!   Monte Carlo paths, deterministic rates
//! - [`LgmModel`]: one-factor Linear Gauss Markov rates on Monte Carlo paths
//! - [`GraphModel`]: the Black-Scholes dynamics recorded into a computation
//!   graph for adjoint sensitivities
//!
//! [`ScriptModel`] wraps them for static dispatch and [`ModelKind`] selects
//! one from configuration.

mod black_scholes;
mod graph;
mod grid;
mod lgm;
mod model_enum;
mod traits;

pub use black_scholes::BlackScholesModel;
pub use graph::GraphModel;
pub use grid::SimulationGrid;
pub use lgm::{LgmModel, LgmParams};
pub use model_enum::{ModelKind, ScriptModel};
pub use traits::{Model, PathSet, PaymentConvention, RegressionRequest};
