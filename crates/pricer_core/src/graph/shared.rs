//! Shared, thread-confined handles onto a computation graph.
//!
//! A `GraphModel` and every value it hands out record into the same graph.
//! The handle is `Rc<RefCell<_>>`, so it cannot cross threads and each model
//! owns its own id space.

use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use super::error::GraphError;
use super::types::{ComputationGraph, NodeId, NodeType};

/// Reference-counted handle to a [`ComputationGraph`].
#[derive(Clone, Default)]
pub struct GraphHandle(Rc<RefCell<ComputationGraph>>);

impl GraphHandle {
    /// Handle onto a fresh, empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared read access.
    ///
    /// # Panics
    ///
    /// Panics if the graph is currently borrowed mutably; recording never
    /// holds a borrow across calls.
    pub fn borrow(&self) -> Ref<'_, ComputationGraph> {
        self.0.borrow()
    }

    /// Exclusive access for recording.
    pub fn borrow_mut(&self) -> RefMut<'_, ComputationGraph> {
        self.0.borrow_mut()
    }

    /// Whether both handles point at the same graph.
    #[inline]
    pub fn same_graph(&self, other: &GraphHandle) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Records an operation and returns a handle to the new node.
    pub fn record(&self, node_type: NodeType, args: &[NodeId]) -> Result<NodeRef, GraphError> {
        let id = self.0.borrow_mut().push(node_type, args)?;
        Ok(self.node(id))
    }

    /// Handle to a constant node.
    pub fn constant(&self, value: f64) -> NodeRef {
        let id = self.0.borrow_mut().constant(value);
        self.node(id)
    }

    /// Handle to an existing node id.
    #[inline]
    pub fn node(&self, id: NodeId) -> NodeRef {
        NodeRef {
            graph: self.clone(),
            id,
        }
    }
}

impl fmt::Debug for GraphHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(graph) => write!(f, "GraphHandle({} nodes)", graph.len()),
            Err(_) => write!(f, "GraphHandle(<recording>)"),
        }
    }
}

/// A node together with the graph it lives in.
#[derive(Clone)]
pub struct NodeRef {
    graph: GraphHandle,
    id: NodeId,
}

impl NodeRef {
    /// Node id.
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Owning graph.
    #[inline]
    pub fn graph(&self) -> &GraphHandle {
        &self.graph
    }

    /// Records `node_type` applied to `self` followed by `others`.
    pub fn apply(&self, node_type: NodeType, others: &[&NodeRef]) -> Result<NodeRef, GraphError> {
        let mut args = Vec::with_capacity(1 + others.len());
        args.push(self.id);
        for other in others {
            if !self.graph.same_graph(&other.graph) {
                return Err(GraphError::ForeignNode);
            }
            args.push(other.id);
        }
        self.graph.record(node_type, &args)
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.graph.same_graph(&other.graph)
    }
}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({})", self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::BinaryFn;

    #[test]
    fn test_apply_records_on_shared_graph() {
        let graph = GraphHandle::new();
        let a = graph.constant(1.0);
        let b = graph.constant(2.0);
        let sum = a.apply(NodeType::Binary(BinaryFn::Add), &[&b]).unwrap();
        assert_eq!(graph.borrow().len(), 3);
        assert_eq!(graph.borrow().node(sum.id()).unwrap().args, vec![a.id(), b.id()]);
    }

    #[test]
    fn test_foreign_nodes_rejected() {
        let g1 = GraphHandle::new();
        let g2 = GraphHandle::new();
        let a = g1.constant(1.0);
        let b = g2.constant(1.0);
        assert_eq!(
            a.apply(NodeType::Binary(BinaryFn::Add), &[&b]),
            Err(GraphError::ForeignNode)
        );
        assert_ne!(a, b);
    }
}
