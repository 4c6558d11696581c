//! Fixed numeric leaf

use chrono::Utc;

use pricegraph_core::{type_meta, GraphError, GraphResult, Meta, Point};

use crate::node::{Node, NodeId, NodeRef};

/// Leaf yielding a fixed number, timestamped at read time.
/// Used for thresholds and pegged rates.
pub struct ConstantNode {
    id: NodeId,
    value: f64,
}

impl ConstantNode {
    pub fn new(value: f64) -> Self {
        Self {
            id: NodeId::new(),
            value,
        }
    }
}

impl Node for ConstantNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn nodes(&self) -> Vec<NodeRef> {
        vec![]
    }

    fn add_nodes(&self, nodes: &[NodeRef]) -> GraphResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        Err(GraphError::Arity { node: "constant", max: 0 })
    }

    fn data_point(&self) -> Point {
        Point::from_value(self.value, Utc::now()).with_meta(self.meta())
    }

    fn meta(&self) -> Meta {
        let mut meta = type_meta("constant");
        meta.insert("value".to_string(), self.value.into());
        meta
    }
}
