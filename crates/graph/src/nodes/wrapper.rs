//! Annotate a subtree with caller-supplied meta

use std::sync::Arc;

use pricegraph_core::{GraphError, GraphResult, Meta, Point};

use crate::node::{Node, NodeId, NodeRef};

/// Forwards its child's point with the meta replaced by an annotation.
/// The child is fixed at construction.
pub struct WrapperNode {
    id: NodeId,
    node: NodeRef,
    meta: Meta,
}

impl WrapperNode {
    pub fn new(node: NodeRef, meta: Meta) -> Self {
        Self {
            id: NodeId::new(),
            node,
            meta,
        }
    }
}

impl Node for WrapperNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn nodes(&self) -> Vec<NodeRef> {
        vec![Arc::clone(&self.node)]
    }

    fn add_nodes(&self, nodes: &[NodeRef]) -> GraphResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        Err(GraphError::Sealed("wrapper"))
    }

    fn data_point(&self) -> Point {
        self.node.data_point().with_meta(self.meta.clone())
    }

    fn meta(&self) -> Meta {
        self.meta.clone()
    }
}
