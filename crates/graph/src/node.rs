//! Graph nodes
//!
//! Every node in the price graph implements [`Node`]. Nodes are shared as
//! `Arc<dyn Node>` so a subtree can be referenced from several parents, and
//! they are wired together through `add_nodes` while the graph is built.
//! After construction the topology does not change.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use pricegraph_core::{DataError, GraphError, GraphResult, Meta, Model, Point};

use crate::nodes::OriginNode;

/// Shared handle to a node
pub type NodeRef = Arc<dyn Node>;

/// Unique identifier for a node, assigned at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Capability set shared by all node variants
pub trait Node: Send + Sync {
    /// Identity used by graph traversal. Two identically configured nodes
    /// still have different IDs.
    fn id(&self) -> NodeId;

    /// Child nodes
    fn nodes(&self) -> Vec<NodeRef>;

    /// Attach children. Fails if the variant's arity would be exceeded.
    fn add_nodes(&self, nodes: &[NodeRef]) -> GraphResult<()>;

    /// Compute the node's point from its children's current points.
    fn data_point(&self) -> Point;

    /// Static description of the node, independent of runtime state.
    fn meta(&self) -> Meta;

    fn as_origin(self: Arc<Self>) -> Option<Arc<OriginNode>> {
        None
    }
}

/// Informational model of a node and everything below it
pub fn model(node: &NodeRef) -> Model {
    Model::new(node.meta(), node.nodes().iter().map(model).collect())
}

/// Point reporting a failed computation, keeping its inputs for diagnosis
pub(crate) fn failed(error: DataError, meta: Meta, sub_points: Vec<Point>) -> Point {
    Point {
        meta,
        sub_points,
        error: Some(error),
        ..Default::default()
    }
}

/// Slot for nodes that take at most one child
#[derive(Default)]
pub(crate) struct ChildSlot(RwLock<Option<NodeRef>>);

impl ChildSlot {
    pub(crate) fn get(&self) -> Option<NodeRef> {
        self.0.read().clone()
    }

    pub(crate) fn nodes(&self) -> Vec<NodeRef> {
        self.get().into_iter().collect()
    }

    pub(crate) fn take(&self) -> Option<NodeRef> {
        self.0.write().take()
    }

    pub(crate) fn add(&self, kind: &'static str, nodes: &[NodeRef]) -> GraphResult<()> {
        match nodes {
            [] => Ok(()),
            [node] => {
                let mut slot = self.0.write();
                if slot.is_some() {
                    return Err(GraphError::Arity { node: kind, max: 1 });
                }
                *slot = Some(Arc::clone(node));
                Ok(())
            }
            _ => Err(GraphError::Arity { node: kind, max: 1 }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::ConstantNode;

    #[test]
    fn test_node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
        assert!(id2.raw() > id1.raw());
    }

    #[test]
    fn test_child_slot_arity() {
        let slot = ChildSlot::default();
        let a: NodeRef = Arc::new(ConstantNode::new(1.0));
        let b: NodeRef = Arc::new(ConstantNode::new(2.0));

        assert!(slot.add("test", &[]).is_ok());
        assert!(slot.get().is_none());
        assert!(slot.add("test", &[Arc::clone(&a), Arc::clone(&b)]).is_err());
        assert!(slot.add("test", &[Arc::clone(&a)]).is_ok());
        assert!(matches!(
            slot.add("test", &[b]),
            Err(GraphError::Arity { node: "test", max: 1 })
        ));
        assert_eq!(slot.get().unwrap().id(), a.id());
    }
}
