//! Backend-agnostic numbers and filters.

use super::{BoolVector, Comparison, PathVector, VectorError};
use crate::graph::{BinaryFn, GraphHandle, NodeRef, NodeType, UnaryFn};

/// A number as seen by a script: per-path values or a graph node.
///
/// A deterministic [`PathVector`] combined with a graph node is lifted into a
/// constant node; a stochastic `PathVector` cannot be combined with a node
/// and fails with [`VectorError::MixedBackends`].
#[derive(Debug, Clone, PartialEq)]
pub enum RandomVariable {
    /// Eagerly evaluated per-path values.
    Paths(PathVector),
    /// Deferred value recorded in a computation graph.
    Node(NodeRef),
}

/// A condition as seen by a script: per-path flags or an indicator node.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Eagerly evaluated per-path flags.
    Paths(BoolVector),
    /// Indicator node carrying `1.0` where the condition holds.
    Node(NodeRef),
}

impl From<PathVector> for RandomVariable {
    fn from(value: PathVector) -> Self {
        RandomVariable::Paths(value)
    }
}

impl From<NodeRef> for RandomVariable {
    fn from(node: NodeRef) -> Self {
        RandomVariable::Node(node)
    }
}

impl From<BoolVector> for Filter {
    fn from(value: BoolVector) -> Self {
        Filter::Paths(value)
    }
}

/// Node for a per-path value when it has to meet a graph node.
fn lift(value: &PathVector, graph: &GraphHandle) -> Result<NodeRef, VectorError> {
    match value.deterministic_value() {
        Some(v) => Ok(graph.constant(v)),
        None if value.size() == 1 => Ok(graph.constant(value.at(0))),
        None => Err(VectorError::MixedBackends),
    }
}

fn lift_flags(value: &BoolVector, graph: &GraphHandle) -> Result<NodeRef, VectorError> {
    lift(&value.to_indicator(), graph)
}

impl RandomVariable {
    /// Deterministic value on `size` paths.
    #[inline]
    pub fn constant(size: usize, value: f64) -> Self {
        RandomVariable::Paths(PathVector::deterministic(size, value))
    }

    /// Number of paths; a graph node counts as one.
    pub fn size(&self) -> usize {
        match self {
            RandomVariable::Paths(p) => p.size(),
            RandomVariable::Node(_) => 1,
        }
    }

    /// Whether the value is known without simulation.
    pub fn is_deterministic(&self) -> bool {
        matches!(self, RandomVariable::Paths(p) if p.is_deterministic())
    }

    /// The broadcast value of a deterministic number.
    pub fn deterministic_value(&self) -> Option<f64> {
        match self {
            RandomVariable::Paths(p) => p.deterministic_value(),
            RandomVariable::Node(_) => None,
        }
    }

    /// Per-path values, if eagerly evaluated.
    pub fn as_paths(&self) -> Option<&PathVector> {
        match self {
            RandomVariable::Paths(p) => Some(p),
            RandomVariable::Node(_) => None,
        }
    }

    /// Graph node, if recorded.
    pub fn as_node(&self) -> Option<&NodeRef> {
        match self {
            RandomVariable::Paths(_) => None,
            RandomVariable::Node(n) => Some(n),
        }
    }

    /// Node for this value on `graph`, lifting deterministic values.
    pub fn to_node(&self, graph: &GraphHandle) -> Result<NodeRef, VectorError> {
        match self {
            RandomVariable::Paths(p) => lift(p, graph),
            RandomVariable::Node(n) if n.graph().same_graph(graph) => Ok(n.clone()),
            RandomVariable::Node(_) => Err(crate::graph::GraphError::ForeignNode.into()),
        }
    }

    /// Applies an elementwise function.
    pub fn unary(&self, f: UnaryFn) -> Result<Self, VectorError> {
        match self {
            RandomVariable::Paths(p) => Ok(p.map(|x| f.apply(x)).into()),
            RandomVariable::Node(n) => Ok(n.apply(NodeType::Unary(f), &[])?.into()),
        }
    }

    /// Combines two numbers with an elementwise function.
    pub fn binary(&self, f: BinaryFn, rhs: &Self) -> Result<Self, VectorError> {
        match (self, rhs) {
            (RandomVariable::Paths(a), RandomVariable::Paths(b)) => {
                Ok(a.zip_map(b, |x, y| f.apply(x, y))?.into())
            }
            (RandomVariable::Node(n), _) | (_, RandomVariable::Node(n)) => {
                let graph = n.graph();
                let left = self.to_node(graph)?;
                let right = rhs.to_node(graph)?;
                Ok(left.apply(NodeType::Binary(f), &[&right])?.into())
            }
        }
    }

    /// `self + rhs`
    pub fn add(&self, rhs: &Self) -> Result<Self, VectorError> {
        self.binary(BinaryFn::Add, rhs)
    }

    /// `self - rhs`
    pub fn sub(&self, rhs: &Self) -> Result<Self, VectorError> {
        self.binary(BinaryFn::Sub, rhs)
    }

    /// `self * rhs`
    pub fn mul(&self, rhs: &Self) -> Result<Self, VectorError> {
        self.binary(BinaryFn::Mul, rhs)
    }

    /// `self / rhs`
    pub fn div(&self, rhs: &Self) -> Result<Self, VectorError> {
        self.binary(BinaryFn::Div, rhs)
    }

    /// `-self`
    pub fn neg(&self) -> Result<Self, VectorError> {
        self.unary(UnaryFn::Neg)
    }

    /// Lane-wise comparison.
    pub fn compare(&self, rhs: &Self, cmp: Comparison) -> Result<Filter, VectorError> {
        match (self, rhs) {
            (RandomVariable::Paths(a), RandomVariable::Paths(b)) => {
                Ok(Filter::Paths(a.compare(b, cmp)?))
            }
            (RandomVariable::Node(n), _) | (_, RandomVariable::Node(n)) => {
                let graph = n.graph();
                let left = self.to_node(graph)?;
                let right = rhs.to_node(graph)?;
                Ok(Filter::Node(
                    left.apply(NodeType::Indicator(cmp), &[&right])?,
                ))
            }
        }
    }

    /// `then` where `filter` holds, `otherwise` elsewhere.
    ///
    /// With graph operands this records `f * then + (1 - f) * otherwise`.
    pub fn select(filter: &Filter, then: &Self, otherwise: &Self) -> Result<Self, VectorError> {
        if let Filter::Paths(flags) = filter {
            if let Some(flag) = flags.deterministic_value() {
                return Ok(if flag { then.clone() } else { otherwise.clone() });
            }
        }
        let graph = match (filter, then, otherwise) {
            (Filter::Node(n), _, _) => n.graph().clone(),
            (_, RandomVariable::Node(n), _) | (_, _, RandomVariable::Node(n)) => n.graph().clone(),
            (
                Filter::Paths(flags),
                RandomVariable::Paths(a),
                RandomVariable::Paths(b),
            ) => return Ok(PathVector::select(flags, a, b)?.into()),
        };
        let f = filter.to_node(&graph)?;
        let a = then.to_node(&graph)?;
        let b = otherwise.to_node(&graph)?;
        Ok(f.apply(NodeType::Select, &[&a, &b])?.into())
    }

    /// Cross-path mean.
    ///
    /// # Errors
    ///
    /// `NotReducible` for graph nodes, whose values exist only after the
    /// graph has been executed.
    pub fn expectation(&self) -> Result<f64, VectorError> {
        match self {
            RandomVariable::Paths(p) => Ok(p.expectation()),
            RandomVariable::Node(_) => Err(VectorError::NotReducible),
        }
    }
}

impl Filter {
    /// Deterministic flag on `size` paths.
    #[inline]
    pub fn constant(size: usize, value: bool) -> Self {
        Filter::Paths(BoolVector::deterministic(size, value))
    }

    /// Whether the flag is known without simulation.
    pub fn is_deterministic(&self) -> bool {
        matches!(self, Filter::Paths(b) if b.is_deterministic())
    }

    /// The broadcast flag of a deterministic filter.
    pub fn deterministic_value(&self) -> Option<bool> {
        match self {
            Filter::Paths(b) => b.deterministic_value(),
            Filter::Node(_) => None,
        }
    }

    /// Per-path flags, if eagerly evaluated.
    pub fn as_paths(&self) -> Option<&BoolVector> {
        match self {
            Filter::Paths(b) => Some(b),
            Filter::Node(_) => None,
        }
    }

    /// Indicator node for this filter on `graph`.
    pub fn to_node(&self, graph: &GraphHandle) -> Result<NodeRef, VectorError> {
        match self {
            Filter::Paths(b) => lift_flags(b, graph),
            Filter::Node(n) if n.graph().same_graph(graph) => Ok(n.clone()),
            Filter::Node(_) => Err(crate::graph::GraphError::ForeignNode.into()),
        }
    }

    fn combine(
        &self,
        rhs: &Self,
        node_type: NodeType,
        eager: fn(&BoolVector, &BoolVector) -> Result<BoolVector, VectorError>,
    ) -> Result<Self, VectorError> {
        match (self, rhs) {
            (Filter::Paths(a), Filter::Paths(b)) => Ok(Filter::Paths(eager(a, b)?)),
            (Filter::Node(n), _) | (_, Filter::Node(n)) => {
                let graph = n.graph();
                let left = self.to_node(graph)?;
                let right = rhs.to_node(graph)?;
                Ok(Filter::Node(left.apply(node_type, &[&right])?))
            }
        }
    }

    /// Lane-wise conjunction.
    pub fn and(&self, rhs: &Self) -> Result<Self, VectorError> {
        self.combine(rhs, NodeType::And, BoolVector::and)
    }

    /// Lane-wise disjunction.
    pub fn or(&self, rhs: &Self) -> Result<Self, VectorError> {
        self.combine(rhs, NodeType::Or, BoolVector::or)
    }

    /// Lane-wise negation.
    pub fn not(&self) -> Result<Self, VectorError> {
        match self {
            Filter::Paths(b) => Ok(Filter::Paths(b.not())),
            Filter::Node(n) => Ok(Filter::Node(n.apply(NodeType::Not, &[])?)),
        }
    }

    /// `1.0` where the filter holds, `0.0` elsewhere.
    pub fn to_indicator(&self) -> RandomVariable {
        match self {
            Filter::Paths(b) => RandomVariable::Paths(b.to_indicator()),
            Filter::Node(n) => RandomVariable::Node(n.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphHandle;

    fn paths(v: &[f64]) -> RandomVariable {
        PathVector::from_paths(v.to_vec()).into()
    }

    #[test]
    fn test_eager_arithmetic() {
        let a = paths(&[1.0, 2.0]);
        let b = RandomVariable::constant(2, 3.0);
        let c = a.mul(&b).unwrap().add(&b).unwrap();
        assert_eq!(c.as_paths().unwrap().values().as_ref(), &[6.0, 9.0]);
        assert_eq!(c.expectation().unwrap(), 7.5);
    }

    #[test]
    fn test_deterministic_propagates() {
        let a = RandomVariable::constant(5, 2.0);
        let b = a.unary(UnaryFn::Exp).unwrap();
        assert!(b.is_deterministic());
        assert_eq!(b.deterministic_value(), Some(2.0_f64.exp()));
    }

    #[test]
    fn test_constant_lifted_into_graph() {
        let graph = GraphHandle::new();
        let id = graph.borrow_mut().input("x", 1.0);
        let x = RandomVariable::Node(graph.node(id));
        let y = x.add(&RandomVariable::constant(1, 2.0)).unwrap();
        let node = y.as_node().unwrap();
        let g = graph.borrow();
        let recorded = g.node(node.id()).unwrap();
        assert_eq!(recorded.node_type, NodeType::Binary(BinaryFn::Add));
        assert!(matches!(
            g.node(recorded.args[1]).unwrap().node_type,
            NodeType::Constant(v) if v == 2.0
        ));
    }

    #[test]
    fn test_stochastic_vector_cannot_meet_node() {
        let graph = GraphHandle::new();
        let x = RandomVariable::Node(graph.constant(1.0));
        let err = x.add(&paths(&[1.0, 2.0])).unwrap_err();
        assert_eq!(err, VectorError::MixedBackends);
        assert_eq!(x.expectation(), Err(VectorError::NotReducible));
    }

    #[test]
    fn test_select_with_graph_filter_records_select() {
        let graph = GraphHandle::new();
        let x = RandomVariable::Node(graph.constant(1.0));
        let cond = x.compare(&RandomVariable::constant(1, 0.5), Comparison::Gt).unwrap();
        let chosen = RandomVariable::select(
            &cond,
            &RandomVariable::constant(1, 10.0),
            &RandomVariable::constant(1, 20.0),
        )
        .unwrap();
        let id = chosen.as_node().unwrap().id();
        assert_eq!(graph.borrow().node(id).unwrap().node_type, NodeType::Select);
    }

    #[test]
    fn test_deterministic_filter_short_circuits_select() {
        let a = paths(&[1.0, 2.0]);
        let b = paths(&[3.0, 4.0]);
        let chosen = RandomVariable::select(&Filter::constant(2, false), &a, &b).unwrap();
        assert_eq!(chosen, b);
    }

    #[test]
    fn test_filter_logic_mixed() {
        let graph = GraphHandle::new();
        let node_filter = Filter::Node(graph.constant(1.0));
        let combined = node_filter.and(&Filter::constant(1, true)).unwrap();
        assert!(matches!(combined, Filter::Node(_)));
        let eager = Filter::Paths(BoolVector::from_paths(vec![true, false]))
            .or(&Filter::constant(2, false))
            .unwrap();
        assert_eq!(eager.as_paths().unwrap().count(), 1);
        assert!(!eager.is_deterministic());
    }

    #[test]
    fn test_filter_determinism() {
        let mixed = Filter::Paths(BoolVector::from_paths(vec![true, false]));
        assert!(!mixed.is_deterministic());
        assert_eq!(mixed.deterministic_value(), None);

        let all = Filter::constant(3, true);
        assert!(all.is_deterministic());
        assert_eq!(all.not().unwrap().deterministic_value(), Some(false));

        let node = Filter::Node(GraphHandle::new().constant(1.0));
        assert!(!node.is_deterministic());
        assert!(node.as_paths().is_none());
    }

    #[test]
    fn test_foreign_graph_rejected() {
        let g1 = GraphHandle::new();
        let g2 = GraphHandle::new();
        let a = RandomVariable::Node(g1.constant(1.0));
        let b = RandomVariable::Node(g2.constant(1.0));
        assert!(a.add(&b).is_err());
    }
}
