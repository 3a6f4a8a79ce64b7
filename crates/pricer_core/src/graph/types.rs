//! # Computation Graph Data Types
//!
//! The graph is an append-only tape: every node refers only to nodes with
//! smaller ids, so insertion order is a topological order and the executor
//! can sweep forwards and backwards without sorting.

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::Serialize;

use super::error::GraphError;
use crate::vectorized::Comparison;

// =============================================================================
// Node identifiers and operations
// =============================================================================

/// Identifier of a node within one [`ComputationGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// Position of the node on the tape.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{}", self.0)
    }
}

/// Elementwise one-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum UnaryFn {
    /// `-x`
    Neg,
    /// `|x|`
    Abs,
    /// `e^x`
    Exp,
    /// `ln(x)`
    Log,
    /// `sqrt(x)`
    Sqrt,
    /// Standard normal CDF
    NormalCdf,
    /// Standard normal PDF
    NormalPdf,
}

impl UnaryFn {
    /// Applies the function to one lane.
    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            UnaryFn::Neg => -x,
            UnaryFn::Abs => x.abs(),
            UnaryFn::Exp => x.exp(),
            UnaryFn::Log => x.ln(),
            UnaryFn::Sqrt => x.sqrt(),
            UnaryFn::NormalCdf => crate::math::norm_cdf(x),
            UnaryFn::NormalPdf => crate::math::norm_pdf(x),
        }
    }

    /// Derivative with respect to the argument, given argument and result.
    #[inline]
    pub fn derivative(self, x: f64, value: f64) -> f64 {
        match self {
            UnaryFn::Neg => -1.0,
            UnaryFn::Abs => {
                if x >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            UnaryFn::Exp => value,
            UnaryFn::Log => 1.0 / x,
            UnaryFn::Sqrt => {
                if value > 0.0 {
                    0.5 / value
                } else {
                    0.0
                }
            }
            UnaryFn::NormalCdf => crate::math::norm_pdf(x),
            UnaryFn::NormalPdf => -x * value,
        }
    }
}

/// Elementwise two-argument functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BinaryFn {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a * b`
    Mul,
    /// `a / b`
    Div,
    /// `min(a, b)`
    Min,
    /// `max(a, b)`
    Max,
    /// `a^b`
    Pow,
}

impl BinaryFn {
    /// Applies the function to one pair of lanes.
    #[inline]
    pub fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryFn::Add => a + b,
            BinaryFn::Sub => a - b,
            BinaryFn::Mul => a * b,
            BinaryFn::Div => a / b,
            BinaryFn::Min => a.min(b),
            BinaryFn::Max => a.max(b),
            BinaryFn::Pow => a.powf(b),
        }
    }

    /// Partial derivatives `(d/da, d/db)` given arguments and result.
    #[inline]
    pub fn partials(self, a: f64, b: f64, value: f64) -> (f64, f64) {
        match self {
            BinaryFn::Add => (1.0, 1.0),
            BinaryFn::Sub => (1.0, -1.0),
            BinaryFn::Mul => (b, a),
            BinaryFn::Div => (1.0 / b, -value / b),
            BinaryFn::Min => {
                if a <= b {
                    (1.0, 0.0)
                } else {
                    (0.0, 1.0)
                }
            }
            BinaryFn::Max => {
                if a >= b {
                    (1.0, 0.0)
                } else {
                    (0.0, 1.0)
                }
            }
            BinaryFn::Pow => {
                let da = if b == 0.0 { 0.0 } else { b * a.powf(b - 1.0) };
                let db = if a > 0.0 { value * a.ln() } else { 0.0 };
                (da, db)
            }
        }
    }
}

/// Operation performed by a graph node.
///
/// Boolean nodes (indicators, `And`, `Or`, `Not`) carry `1.0` for true and
/// `0.0` for false on every path and have zero derivative.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum NodeType {
    /// Literal value.
    Constant(f64),
    /// Named market input; sensitivities are reported for these.
    Input(usize),
    /// Correlated standard normal draw for one simulation step and factor.
    Variate(VariateKey),
    /// Elementwise function of one argument.
    Unary(UnaryFn),
    /// Elementwise function of two arguments.
    Binary(BinaryFn),
    /// `1.0` where the comparison of the two arguments holds.
    Indicator(Comparison),
    /// Logical and of two indicators.
    And,
    /// Logical or of two indicators.
    Or,
    /// Logical negation of an indicator.
    Not,
    /// `f * a + (1 - f) * b` for indicator `f`; arguments `[f, a, b]`.
    Select,
    /// Regression estimate of `E[y | x]`; arguments `[y, mask?, x...]`.
    ConditionalExpectation {
        /// Polynomial order
        order: usize,
        /// Whether the second argument is a mask indicator
        masked: bool,
    },
    /// Cross-path mean broadcast to every path.
    Expectation,
}

impl NodeType {
    /// Short operation name.
    pub fn name(&self) -> &'static str {
        match self {
            NodeType::Constant(_) => "constant",
            NodeType::Input(_) => "input",
            NodeType::Variate(_) => "variate",
            NodeType::Unary(_) => "unary",
            NodeType::Binary(_) => "binary",
            NodeType::Indicator(_) => "indicator",
            NodeType::And => "and",
            NodeType::Or => "or",
            NodeType::Not => "not",
            NodeType::Select => "select",
            NodeType::ConditionalExpectation { .. } => "conditional_expectation",
            NodeType::Expectation => "expectation",
        }
    }

    /// Visual and semantic grouping of the node.
    pub fn group(&self) -> NodeGroup {
        match self {
            NodeType::Constant(_) => NodeGroup::Constant,
            NodeType::Input(_) => NodeGroup::Input,
            NodeType::Variate(_) => NodeGroup::Random,
            _ => NodeGroup::Intermediate,
        }
    }

    fn check_arity(&self, got: usize) -> Result<(), GraphError> {
        let expected = match self {
            NodeType::Constant(_) | NodeType::Input(_) | NodeType::Variate(_) => 0,
            NodeType::Unary(_) | NodeType::Not | NodeType::Expectation => 1,
            NodeType::Binary(_) | NodeType::Indicator(_) | NodeType::And | NodeType::Or => 2,
            NodeType::Select => 3,
            NodeType::ConditionalExpectation { masked, .. } => {
                let minimum = if *masked { 2 } else { 1 };
                if got >= minimum {
                    return Ok(());
                }
                minimum
            }
        };
        if got != expected {
            return Err(GraphError::InvalidArity {
                node_type: self.name().to_string(),
                expected,
                got,
            });
        }
        Ok(())
    }
}

/// Key of a random draw: simulation step and factor within the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct VariateKey {
    /// Index of the simulation step (0 = first step after today)
    pub step: usize,
    /// Index of the driving factor
    pub factor: usize,
}

/// Grouping used when exporting the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum NodeGroup {
    /// Literal values
    Constant,
    /// Market inputs
    Input,
    /// Random draws
    Random,
    /// Everything else
    Intermediate,
}

/// A recorded operation and its arguments.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct GraphNode {
    /// Operation
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub node_type: NodeType,
    /// Argument node ids, all smaller than this node's id
    pub args: Vec<NodeId>,
}

/// Named market input with the value used when the graph is executed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct GraphInput {
    /// Input name, e.g. `spot:EQ-SPX`
    pub name: String,
    /// Base value
    pub value: f64,
    /// Node carrying the input
    pub node: NodeId,
}

// =============================================================================
// ComputationGraph
// =============================================================================

/// Append-only computation tape.
///
/// # Example
///
/// ```rust
/// use pricer_core::graph::{BinaryFn, ComputationGraph, NodeType};
///
/// let mut graph = ComputationGraph::new();
/// let spot = graph.input("spot", 100.0);
/// let two = graph.constant(2.0);
/// let product = graph.push(NodeType::Binary(BinaryFn::Mul), &[spot, two]).unwrap();
/// assert_eq!(graph.len(), 3);
/// assert_eq!(graph.depth(product), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ComputationGraph {
    nodes: Vec<GraphNode>,
    inputs: Vec<GraphInput>,
    input_index: HashMap<String, usize>,
    variates: HashMap<VariateKey, NodeId>,
    constants: HashMap<u64, NodeId>,
    outputs: Vec<(String, NodeId)>,
}

impl ComputationGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of recorded nodes.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no node has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id.
    pub fn node(&self, id: NodeId) -> Result<&GraphNode, GraphError> {
        self.nodes.get(id.0).ok_or(GraphError::UnknownNode(id.0))
    }

    /// All nodes in tape order.
    #[inline]
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Records an operation.
    ///
    /// # Errors
    ///
    /// `InvalidArity` for a wrong argument count, `UnknownNode` for an
    /// argument id that has not been recorded.
    pub fn push(&mut self, node_type: NodeType, args: &[NodeId]) -> Result<NodeId, GraphError> {
        node_type.check_arity(args.len())?;
        if let Some(bad) = args.iter().find(|a| a.0 >= self.nodes.len()) {
            return Err(GraphError::UnknownNode(bad.0));
        }
        Ok(self.append(node_type, args.to_vec()))
    }

    fn append(&mut self, node_type: NodeType, args: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(GraphNode { node_type, args });
        id
    }

    /// Constant node, shared between equal values.
    pub fn constant(&mut self, value: f64) -> NodeId {
        let key = value.to_bits();
        if let Some(&id) = self.constants.get(&key) {
            return id;
        }
        let id = self.append(NodeType::Constant(value), Vec::new());
        self.constants.insert(key, id);
        id
    }

    /// Named input node; recording the same name twice returns the first node.
    pub fn input(&mut self, name: &str, value: f64) -> NodeId {
        if let Some(&slot) = self.input_index.get(name) {
            return self.inputs[slot].node;
        }
        let slot = self.inputs.len();
        let node = self.append(NodeType::Input(slot), Vec::new());
        self.inputs.push(GraphInput {
            name: name.to_string(),
            value,
            node,
        });
        self.input_index.insert(name.to_string(), slot);
        node
    }

    /// Variate node for a step and factor, shared between requests.
    pub fn variate(&mut self, key: VariateKey) -> NodeId {
        if let Some(&id) = self.variates.get(&key) {
            return id;
        }
        let id = self.append(NodeType::Variate(key), Vec::new());
        self.variates.insert(key, id);
        id
    }

    /// Recorded inputs in creation order.
    #[inline]
    pub fn inputs(&self) -> &[GraphInput] {
        &self.inputs
    }

    /// Changes the value an input takes in subsequent executions.
    pub fn set_input_value(&mut self, name: &str, value: f64) -> Result<(), GraphError> {
        let slot = *self
            .input_index
            .get(name)
            .ok_or_else(|| GraphError::UnknownInput(name.to_string()))?;
        self.inputs[slot].value = value;
        Ok(())
    }

    /// Value of the input in the given slot.
    pub(crate) fn input_value(&self, slot: usize) -> Option<f64> {
        self.inputs.get(slot).map(|i| i.value)
    }

    /// Marks a node as a named output.
    pub fn declare_output(&mut self, name: &str, id: NodeId) -> Result<(), GraphError> {
        self.node(id)?;
        self.outputs.retain(|(n, _)| n != name);
        self.outputs.push((name.to_string(), id));
        Ok(())
    }

    /// Declared outputs.
    #[inline]
    pub fn outputs(&self) -> &[(String, NodeId)] {
        &self.outputs
    }

    /// Output node by name.
    pub fn output(&self, name: &str) -> Option<NodeId> {
        self.outputs.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
    }

    /// Longest chain of nodes ending at `id`, counting nodes.
    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = vec![0usize; id.0 + 1];
        for (i, node) in self.nodes.iter().enumerate().take(id.0 + 1) {
            depth[i] = 1 + node.args.iter().map(|a| depth[a.0]).max().unwrap_or(0);
        }
        depth[id.0]
    }

    /// Serialisable node/link view of the tape.
    pub fn snapshot(&self) -> GraphSnapshot {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| SnapshotNode {
                id: NodeId(i),
                node_type: node.node_type.name(),
                group: node.node_type.group(),
                label: match &node.node_type {
                    NodeType::Input(slot) => self.inputs[*slot].name.clone(),
                    NodeType::Constant(v) => v.to_string(),
                    other => format!("{:?}", other),
                },
            })
            .collect();
        let links = self
            .nodes
            .iter()
            .enumerate()
            .flat_map(|(i, node)| {
                node.args.iter().map(move |a| SnapshotLink {
                    source: *a,
                    target: NodeId(i),
                })
            })
            .collect();
        GraphSnapshot {
            nodes,
            links,
            outputs: self.outputs.clone(),
        }
    }
}

/// Export form of a graph: nodes, links and outputs.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct GraphSnapshot {
    /// One entry per node
    pub nodes: Vec<SnapshotNode>,
    /// One entry per argument edge
    pub links: Vec<SnapshotLink>,
    /// Declared outputs
    pub outputs: Vec<(String, NodeId)>,
}

/// Node entry of a [`GraphSnapshot`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SnapshotNode {
    /// Node id
    pub id: NodeId,
    /// Operation name
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub node_type: &'static str,
    /// Grouping
    pub group: NodeGroup,
    /// Human-readable label
    pub label: String,
}

/// Edge entry of a [`GraphSnapshot`].
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct SnapshotLink {
    /// Argument node
    pub source: NodeId,
    /// Consuming node
    pub target: NodeId,
}
