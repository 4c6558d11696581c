//! Relabel a child's tick under another pair

use pricegraph_core::{type_meta, DataError, GraphResult, Meta, Pair, Point, Tick};

use crate::node::{failed, ChildSlot, Node, NodeId, NodeRef};

/// Forwards its child's tick under the alias pair, e.g. `WETH/USD` served as `ETH/USD`.
pub struct AliasNode {
    id: NodeId,
    alias: Pair,
    node: ChildSlot,
}

impl AliasNode {
    pub fn new(alias: Pair) -> Self {
        Self {
            id: NodeId::new(),
            alias,
            node: ChildSlot::default(),
        }
    }

    pub fn alias(&self) -> &Pair {
        &self.alias
    }
}

impl Node for AliasNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.node.nodes()
    }

    fn add_nodes(&self, nodes: &[NodeRef]) -> GraphResult<()> {
        self.node.add("alias", nodes)
    }

    fn data_point(&self) -> Point {
        let Some(node) = self.node.get() else {
            return failed(DataError::NoChild, self.meta(), vec![]);
        };

        let child = node.data_point();
        let tick = match child.validate().and_then(|_| child.tick().cloned()) {
            Ok(tick) => Tick {
                pair: self.alias.clone(),
                ..tick
            },
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
        let mut meta = type_meta("alias");
        meta.insert("alias".to_string(), self.alias.to_string().into());
        meta
    }
}
