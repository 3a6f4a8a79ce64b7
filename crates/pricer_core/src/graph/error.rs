//! # Graph Error Types
//!
//! Errors raised while recording into or executing a computation graph.

use crate::math::RegressionError;
use thiserror::Error;

/// Error type for computation graph construction and execution.
///
/// # Example
///
/// ```rust
/// use pricer_core::graph::GraphError;
///
/// let error = GraphError::UnknownNode(17);
/// assert_eq!(error.to_string(), "Unknown graph node 17");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    /// Node id not present in the graph.
    #[error("Unknown graph node {0}")]
    UnknownNode(usize),

    /// Operation recorded with the wrong number of arguments.
    #[error("Node type {node_type} expects {expected} arguments, got {got}")]
    InvalidArity {
        /// Operation name
        node_type: String,
        /// Expected argument count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Two node handles from different graphs were combined.
    #[error("Cannot combine nodes recorded on different graphs")]
    ForeignNode,

    /// No input with the given name was recorded.
    #[error("Unknown graph input '{0}'")]
    UnknownInput(String),

    /// The variate source cannot provide draws for a variate node.
    #[error("No random draws available for step {step}, factor {factor}")]
    MissingVariate {
        /// Simulation step index
        step: usize,
        /// Factor index within the step
        factor: usize,
    },

    /// Regression inside a conditional expectation node failed.
    #[error("Conditional expectation failed: {0}")]
    Regression(#[from] RegressionError),
}
