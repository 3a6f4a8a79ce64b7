//! Computation graph recording and execution.
//!
//! A [`ComputationGraph`] is an append-only tape of nodes. Each node holds an
//! operation and the ids of its arguments, which always precede it, so the
//! insertion order is a valid topological order.
//!
//! - [`types`]: node kinds, the graph itself and its serialisable snapshot
//! - [`shared`]: a shared handle for recording from several values at once
//! - [`executor`]: forward evaluation over Monte Carlo paths and reverse-mode
//!   sensitivities
//!
//! Nodes fall into four groups ([`NodeGroup`]): constants, named inputs
//! (market data a sensitivity can be taken against), random variates and
//! intermediate operations.

pub mod error;
pub mod executor;
pub mod shared;
pub mod types;

pub use error::GraphError;
pub use executor::{ForwardPass, GraphExecutor, NoVariates, Sensitivities, VariateSource};
pub use shared::{GraphHandle, NodeRef};
pub use types::{
    BinaryFn, ComputationGraph, GraphInput, GraphNode, GraphSnapshot, NodeGroup, NodeId, NodeType,
    SnapshotLink, SnapshotNode, UnaryFn, VariateKey,
};
