//! Forward-declared pointer to another model's root

use pricegraph_core::{type_meta, DataError, GraphResult, Meta, Point};

use crate::node::{failed, ChildSlot, Node, NodeId, NodeRef};

/// Placeholder that lets one model refer to another model's root.
///
/// It is created empty and attached once every root exists, which is how
/// models can be defined in any order. Attaching may create a cycle; run
/// [`detect_cycle`](crate::detect_cycle) on every root before the first read.
pub struct ReferenceNode {
    id: NodeId,
    model: Option<String>,
    node: ChildSlot,
}

impl ReferenceNode {
    pub fn new() -> Self {
        Self {
            id: NodeId::new(),
            model: None,
            node: ChildSlot::default(),
        }
    }

    /// Reference to a named model. The name only shows up in `meta`.
    pub fn named(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::new()
        }
    }

    pub fn is_attached(&self) -> bool {
        self.node.get().is_some()
    }

    /// Drop the link to the target. Used to break the `Arc` loop left by a
    /// graph that failed validation.
    pub fn detach(&self) -> Option<NodeRef> {
        self.node.take()
    }
}

impl Default for ReferenceNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for ReferenceNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.node.nodes()
    }

    fn add_nodes(&self, nodes: &[NodeRef]) -> GraphResult<()> {
        self.node.add("reference", nodes)
    }

    fn data_point(&self) -> Point {
        let Some(node) = self.node.get() else {
            return failed(DataError::NoChild, self.meta(), vec![]);
        };

        let child = node.data_point();
        Point {
            value: child.value.clone(),
            time: child.time,
            error: child.error.clone(),
            meta: self.meta(),
            sub_points: vec![child],
        }
    }

    fn meta(&self) -> Meta {
        let mut meta = type_meta("reference");
        if let Some(model) = &self.model {
            meta.insert("model".to_string(), model.clone().into());
        }
        meta
    }
}
