//! Graph traversal and cycle detection
//!
//! Both operate only on [`Node::nodes`] and [`Node::id`]. Cycle detection is
//! a build-time check; reads assume the graph is acyclic.

use std::collections::HashSet;
use std::sync::Arc;

use crate::node::{NodeId, NodeRef};
use crate::nodes::OriginNode;

/// Call `f` once for every distinct node reachable from `roots`.
pub fn walk<F>(roots: &[NodeRef], mut f: F)
where
    F: FnMut(&NodeRef),
{
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut order: Vec<NodeRef> = Vec::new();
    let mut stack: Vec<NodeRef> = roots.iter().rev().map(Arc::clone).collect();

    while let Some(node) = stack.pop() {
        if !visited.insert(node.id()) {
            continue;
        }
        stack.extend(node.nodes().into_iter().rev());
        order.push(node);
    }

    for node in &order {
        f(node);
    }
}

/// Distinct origin leaves reachable from `roots`
pub fn origin_nodes(roots: &[NodeRef]) -> Vec<Arc<OriginNode>> {
    let mut origins = Vec::new();
    walk(roots, |node| {
        if let Some(origin) = Arc::clone(node).as_origin() {
            origins.push(origin);
        }
    });
    origins
}

/// First cycle reachable from `root`, as the path from the re-entered node
/// back to itself. Empty if there is none.
pub fn detect_cycle(root: &NodeRef) -> Vec<NodeRef> {
    let mut path = Vec::new();
    let mut on_path = HashSet::new();
    let mut done = HashSet::new();
    visit(root, &mut path, &mut on_path, &mut done).unwrap_or_default()
}

fn visit(
    node: &NodeRef,
    path: &mut Vec<NodeRef>,
    on_path: &mut HashSet<NodeId>,
    done: &mut HashSet<NodeId>,
) -> Option<Vec<NodeRef>> {
    let id = node.id();
    if on_path.contains(&id) {
        let start = path.iter().position(|n| n.id() == id)?;
        let mut cycle: Vec<NodeRef> = path[start..].to_vec();
        cycle.push(Arc::clone(node));
        return Some(cycle);
    }
    if done.contains(&id) {
        return None;
    }

    path.push(Arc::clone(node));
    on_path.insert(id);
    for child in node.nodes() {
        if let Some(cycle) = visit(&child, path, on_path, done) {
            return Some(cycle);
        }
    }
    path.pop();
    on_path.remove(&id);
    done.insert(id);
    None
}
