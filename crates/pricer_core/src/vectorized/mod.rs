//! Vectorised path values.
//!
//! Every number a script manipulates is a [`RandomVariable`]: either a
//! [`PathVector`] holding one `f64` per Monte Carlo path (or a single
//! broadcast value when the quantity is deterministic), or a handle onto a
//! computation graph node. Comparisons produce a [`Filter`], the boolean
//! counterpart, which drives indicator-weighted selection.
//!
//! Both representations follow the same arithmetic contract, so code written
//! against `RandomVariable` does not know which backend produced its inputs.
//!
//! # Examples
//!
//! ```
//! use pricer_core::vectorized::{Comparison, PathVector, RandomVariable};
//!
//! let spot = RandomVariable::from(PathVector::from_paths(vec![90.0, 110.0]));
//! let strike = RandomVariable::constant(2, 100.0);
//!
//! let in_the_money = spot.compare(&strike, Comparison::Gt).unwrap();
//! let payoff = RandomVariable::select(
//!     &in_the_money,
//!     &spot.sub(&strike).unwrap(),
//!     &RandomVariable::constant(2, 0.0),
//! )
//! .unwrap();
//!
//! assert_eq!(payoff.as_paths().unwrap().values().as_ref(), &[0.0, 10.0]);
//! assert_eq!(payoff.expectation().unwrap(), 5.0);
//! ```

mod bool_vector;
mod path_vector;
mod random_variable;

pub use bool_vector::BoolVector;
pub use path_vector::PathVector;
pub use random_variable::{Filter, RandomVariable};

use crate::graph::GraphError;
use thiserror::Error;

/// Relational operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Comparison {
    /// `==`, with a relative tolerance of a few ulps
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl Comparison {
    /// Evaluates the comparison on one pair of lanes.
    ///
    /// Equality uses a tolerance of 42 ulps relative to the larger operand,
    /// so values produced by different summation orders still compare equal.
    #[inline]
    pub fn holds(self, a: f64, b: f64) -> bool {
        match self {
            Comparison::Eq => close_enough(a, b),
            Comparison::Ne => !close_enough(a, b),
            Comparison::Lt => a < b && !close_enough(a, b),
            Comparison::Le => a < b || close_enough(a, b),
            Comparison::Gt => a > b && !close_enough(a, b),
            Comparison::Ge => a > b || close_enough(a, b),
        }
    }

    /// Operator symbol.
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
        }
    }
}

#[inline]
fn close_enough(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    let diff = (a - b).abs();
    let tolerance = 42.0 * f64::EPSILON;
    diff <= tolerance * a.abs() && diff <= tolerance * b.abs()
}

/// Errors from combining vectorised values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VectorError {
    /// Operands hold different numbers of paths.
    #[error("Path count mismatch: {left} vs {right}")]
    SizeMismatch {
        /// Left operand size
        left: usize,
        /// Right operand size
        right: usize,
    },

    /// A per-path vector was combined with a graph node.
    #[error("Cannot combine a path-wise vector with a computation graph node")]
    MixedBackends,

    /// A graph node cannot be reduced without executing the graph.
    #[error("Graph node values are only available after executing the graph")]
    NotReducible,

    /// Graph recording failed.
    #[error(transparent)]
    Graph(#[from] GraphError),
}
