//! Deviation circuit breaker
//!
//! Compares a value against a reference and flags the value when the two
//! drift apart by more than a threshold. The value is always passed through;
//! callers decide whether a flagged value is acceptable.

use parking_lot::RwLock;
use std::sync::Arc;

use pricegraph_core::{type_meta, DataError, GraphError, GraphResult, Meta, Point};

use crate::node::{failed, Node, NodeId, NodeRef};

const ROLES: [&str; 3] = ["value", "reference", "threshold"];

/// Children are added in role order: value, reference, threshold.
pub struct DevCircuitBreakerNode {
    id: NodeId,
    nodes: RwLock<Vec<NodeRef>>,
}

impl DevCircuitBreakerNode {
    pub fn new() -> Self {
        Self {
            id: NodeId::new(),
            nodes: RwLock::new(Vec::with_capacity(ROLES.len())),
        }
    }

    pub fn with_nodes(value: NodeRef, reference: NodeRef, threshold: NodeRef) -> Self {
        let node = Self::new();
        *node.nodes.write() = vec![value, reference, threshold];
        node
    }
}

impl Default for DevCircuitBreakerNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for DevCircuitBreakerNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.nodes.read().clone()
    }

    fn add_nodes(&self, nodes: &[NodeRef]) -> GraphResult<()> {
        let mut slots = self.nodes.write();
        if slots.len() + nodes.len() > ROLES.len() {
            return Err(GraphError::Arity {
                node: "deviation_circuit_breaker",
                max: ROLES.len(),
            });
        }
        slots.extend(nodes.iter().map(Arc::clone));
        Ok(())
    }

    fn data_point(&self) -> Point {
        let nodes = self.nodes();
        if nodes.len() < ROLES.len() {
            return failed(DataError::NoChild, self.meta(), vec![]);
        }

        let mut numbers = [0.0; 3];
        let mut points = Vec::with_capacity(ROLES.len());
        for (i, node) in nodes.iter().enumerate() {
            let point = node.data_point();
            match point.validate().and_then(|_| point.number()) {
                Ok(n) => numbers[i] = n,
                Err(e) => return failed(e, self.meta(), vec![point]),
            }
            points.push(point);
        }

        let [value, reference, threshold] = numbers;
        let deviation = (1.0 - reference / value).abs();

        let mut meta = self.meta();
        meta.insert("deviation".to_string(), deviation.into());
        meta.insert("threshold".to_string(), threshold.into());

        let mut point = points.swap_remove(0).with_meta(meta);
        if value == 0.0 || !deviation.is_finite() {
            point.error = Some(DataError::UndefinedDeviation { value, reference });
        } else if deviation > threshold {
            point.error = Some(DataError::DeviationExceeded {
                deviation,
                threshold,
            });
        }
        point
    }

    fn meta(&self) -> Meta {
        type_meta("deviation_circuit_breaker")
    }
}
