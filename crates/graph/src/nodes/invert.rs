//! Invert a child's tick

use pricegraph_core::{type_meta, DataError, GraphResult, Meta, Point, Tick};

use crate::node::{failed, ChildSlot, Node, NodeId, NodeRef};

/// Serves `B/A` from a child producing `A/B`.
pub struct InvertNode {
    id: NodeId,
    node: ChildSlot,
}

impl InvertNode {
    pub fn new() -> Self {
        Self {
            id: NodeId::new(),
            node: ChildSlot::default(),
        }
    }
}

impl Default for InvertNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for InvertNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.node.nodes()
    }

    fn add_nodes(&self, nodes: &[NodeRef]) -> GraphResult<()> {
        self.node.add("invert", nodes)
    }

    fn data_point(&self) -> Point {
        let Some(node) = self.node.get() else {
            return failed(DataError::NoChild, self.meta(), vec![]);
        };

        let child = node.data_point();
        let tick = match child.validate().and_then(|_| child.tick().map(Tick::invert)) {
            Ok(tick) => tick,
            Err(e) => return failed(e, self.meta(), vec![child]),
        };

        Point {
            value: Some(tick.into()),
            time: child.time,
            meta: self.meta(),
            sub_points: vec![child],
            error: None,
        }
    }

    fn meta(&self) -> Meta {
        type_meta("invert")
    }
}
