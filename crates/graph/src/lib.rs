//! Price computation graph
//!
//! Features:
//! - Composable node variants: origins, medians, multi-hop conversions,
//!   deviation circuit breakers, aliases and inversions
//! - Pull-based evaluation; only origin leaves hold state
//! - Errors travel inside points, so a partial tree stays inspectable
//! - Build-time cycle detection over forward references

pub mod builder;
pub mod node;
pub mod nodes;
pub mod walk;

pub use builder::{build_graph, Graph};
pub use node::{model, Node, NodeId, NodeRef};
pub use nodes::*;
pub use walk::{detect_cycle, origin_nodes, walk};
