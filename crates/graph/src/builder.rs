//! Two-pass graph construction from a [`GraphConfig`]
//!
//! 1. Allocate a [`ReferenceNode`] placeholder for every model name.
//! 2. Build every model tree; `reference` definitions resolve to the
//!    placeholders, so models may refer to each other in any order.
//! 3. Attach every placeholder to its built root.
//! 4. Reject the graph if any root reaches a cycle.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use pricegraph_core::{
    model_key, GraphConfig, GraphError, GraphResult, NodeConfig, OriginDefaults,
};

use crate::node::{Node, NodeRef};
use crate::nodes::{
    AliasNode, ConstantNode, DevCircuitBreakerNode, IndirectNode, InvertNode, MedianNode,
    OriginNode, ReferenceNode, WrapperNode,
};
use crate::walk::{detect_cycle, walk};

/// Model name to root node. Names are canonical, see [`model_key`].
pub type Graph = BTreeMap<String, NodeRef>;

type Placeholders = BTreeMap<String, Arc<ReferenceNode>>;

/// Build and validate a graph
pub fn build_graph(config: &GraphConfig) -> GraphResult<Graph> {
    build_with(config, &placeholders(config)?)
}

fn placeholders(config: &GraphConfig) -> GraphResult<Placeholders> {
    let mut placeholders = Placeholders::new();
    for name in config.models.keys() {
        let key = model_key(name);
        if placeholders.contains_key(&key) {
            return Err(GraphError::DuplicateModel(key));
        }
        let placeholder = Arc::new(ReferenceNode::named(key.as_str()));
        placeholders.insert(key, placeholder);
    }
    Ok(placeholders)
}

/// On error every placeholder is detached, releasing any reference loop.
fn build_with(config: &GraphConfig, placeholders: &Placeholders) -> GraphResult<Graph> {
    let result = assemble(config, placeholders);
    if let Err(e) = &result {
        warn!("Rejected price graph: {}", e);
        for placeholder in placeholders.values() {
            placeholder.detach();
        }
    }
    result
}

fn assemble(config: &GraphConfig, placeholders: &Placeholders) -> GraphResult<Graph> {
    let builder = Builder {
        defaults: config.origin_defaults,
        placeholders,
    };

    let mut graph = Graph::new();
    for (name, definition) in &config.models {
        let root = builder.build(definition)?;
        debug!("Built model {}", name);
        graph.insert(model_key(name), root);
    }

    for (name, root) in &graph {
        if let Some(placeholder) = placeholders.get(name) {
            placeholder.add_nodes(&[Arc::clone(root)])?;
        }
    }

    for (name, root) in &graph {
        let cycle = detect_cycle(root);
        if !cycle.is_empty() {
            return Err(GraphError::Cycle(format!("{}: {}", name, describe(&cycle))));
        }
    }

    let roots: Vec<NodeRef> = graph.values().cloned().collect();
    let mut node_count = 0;
    walk(&roots, |_| node_count += 1);
    info!("Built price graph with {} models and {} nodes", graph.len(), node_count);

    Ok(graph)
}

struct Builder<'a> {
    defaults: OriginDefaults,
    placeholders: &'a Placeholders,
}

impl Builder<'_> {
    fn build(&self, definition: &NodeConfig) -> GraphResult<NodeRef> {
        let node: NodeRef = match definition {
            NodeConfig::Origin {
                origin,
                query,
                freshness_threshold_secs,
                expiry_threshold_secs,
            } => {
                let freshness =
                    freshness_threshold_secs.unwrap_or(self.defaults.freshness_threshold_secs);
                let expiry = expiry_threshold_secs.unwrap_or(self.defaults.expiry_threshold_secs);
                Arc::new(OriginNode::new(
                    origin.as_str(),
                    query.as_str(),
                    Duration::from_secs(freshness),
                    Duration::from_secs(expiry),
                )?)
            }
            NodeConfig::Median { min, sources } => {
                let node = Arc::new(MedianNode::new(*min)?);
                node.add_nodes(&self.build_all(sources)?)?;
                node
            }
            NodeConfig::Indirect { sources } => {
                let node = Arc::new(IndirectNode::new());
                node.add_nodes(&self.build_all(sources)?)?;
                node
            }
            NodeConfig::Deviation {
                value,
                reference,
                threshold,
            } => Arc::new(DevCircuitBreakerNode::with_nodes(
                self.build(value)?,
                self.build(reference)?,
                self.build(threshold)?,
            )),
            NodeConfig::Alias { pair, source } => {
                let node = Arc::new(AliasNode::new(pair.clone()));
                node.add_nodes(&[self.build(source)?])?;
                node
            }
            NodeConfig::Invert { source } => {
                let node = Arc::new(InvertNode::new());
                node.add_nodes(&[self.build(source)?])?;
                node
            }
            NodeConfig::Reference { model } => {
                let placeholder = self
                    .placeholders
                    .get(&model_key(model))
                    .ok_or_else(|| GraphError::UnknownModel(model.clone()))?;
                Arc::clone(placeholder) as NodeRef
            }
            NodeConfig::Wrapper { meta, source } => {
                Arc::new(WrapperNode::new(self.build(source)?, meta.clone()))
            }
            NodeConfig::Constant { value } => Arc::new(ConstantNode::new(*value)),
        };
        Ok(node)
    }

    fn build_all(&self, definitions: &[NodeConfig]) -> GraphResult<Vec<NodeRef>> {
        definitions.iter().map(|d| self.build(d)).collect()
    }
}

fn describe(cycle: &[NodeRef]) -> String {
    cycle
        .iter()
        .map(|node| {
            let meta = node.meta();
            let kind = meta.get("type").and_then(|v| v.as_str()).unwrap_or("node");
            match meta.get("model").and_then(|v| v.as_str()) {
                Some(model) => format!("{}({})", kind, model),
                None => kind.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walk::origin_nodes;
    use chrono::Utc;
    use pricegraph_core::{DataError, Pair, Point, Tick};
    use serde_json::json;
    use std::io::Write;

    fn config(models: serde_json::Value) -> GraphConfig {
        serde_json::from_value(json!({ "models": models })).unwrap()
    }

    fn origin(name: &str, query: &str) -> serde_json::Value {
        json!({ "type": "origin", "origin": name, "query": query })
    }

    #[test]
    fn test_builds_nested_models() {
        let graph = build_graph(&config(json!({
            "ETH/USD": {
                "type": "median",
                "min": 1,
                "sources": [origin("a", "ETH/USD"), origin("b", "ETHUSD")]
            },
            "USD/ETH": {
                "type": "invert",
                "source": { "type": "reference", "model": "ETH/USD" }
            }
        })))
        .unwrap();

        assert_eq!(graph.keys().collect::<Vec<_>>(), vec!["ETH/USD", "USD/ETH"]);

        let roots: Vec<NodeRef> = graph.values().cloned().collect();
        let origins = origin_nodes(&roots);
        assert_eq!(origins.len(), 2);
        assert_eq!(origins[0].freshness_threshold(), Duration::from_secs(60));
        assert_eq!(origins[0].expiry_threshold(), Duration::from_secs(300));

        let now = Utc::now();
        for origin in &origins {
            let tick = Tick::new(Pair::new("ETH", "USD"), 2000.0);
            origin.set_data_point(Point::from_value(tick, now)).unwrap();
        }

        let point = graph["USD/ETH"].data_point();
        assert!(point.is_valid(), "{}", point);
        let tick = point.tick().unwrap();
        assert_eq!(tick.pair, Pair::new("USD", "ETH"));
        assert!((tick.price - 0.0005).abs() < 1e-12);
    }

    #[test]
    fn test_reference_defined_before_target() {
        let graph = build_graph(&config(json!({
            "A/B": { "type": "reference", "model": "C/D" },
            "C/D": { "type": "constant", "value": 2.0 }
        })))
        .unwrap();

        assert_eq!(graph["A/B"].data_point().number(), Ok(2.0));
    }

    #[test]
    fn test_deviation_and_alias() {
        let graph = build_graph(&config(json!({
            "ETH/USD": {
                "type": "deviation",
                "value": { "type": "constant", "value": 100.0 },
                "reference": { "type": "constant", "value": 80.0 },
                "threshold": { "type": "constant", "value": 0.1 }
            },
            "WETH/USD": {
                "type": "alias",
                "pair": "WETH/USD",
                "source": origin("a", "ETH/USD")
            }
        })))
        .unwrap();

        let point = graph["ETH/USD"].data_point();
        assert_eq!(point.number(), Ok(100.0));
        assert!(matches!(point.error, Some(DataError::DeviationExceeded { .. })));

        assert_eq!(graph["WETH/USD"].data_point().error, Some(DataError::NotSet));
    }

    #[test]
    fn test_unknown_reference() {
        let result = build_graph(&config(json!({
            "A/B": { "type": "reference", "model": "X/Y" }
        })));
        assert!(matches!(result, Err(GraphError::UnknownModel(name)) if name == "X/Y"));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let result = build_graph(&config(json!({
            "A/B": {
                "type": "median",
                "min": 1,
                "sources": [{ "type": "reference", "model": "A/B" }]
            }
        })));

        let Err(GraphError::Cycle(path)) = result else {
            panic!("expected a cycle");
        };
        assert!(path.contains("reference(A/B)"), "{}", path);
    }

    #[test]
    fn test_mutual_references_are_a_cycle() {
        let result = build_graph(&config(json!({
            "A/B": { "type": "invert", "source": { "type": "reference", "model": "B/A" } },
            "B/A": { "type": "invert", "source": { "type": "reference", "model": "A/B" } }
        })));
        assert!(matches!(result, Err(GraphError::Cycle(_))));
    }

    #[test]
    fn test_model_names_are_canonical() {
        let graph = build_graph(&config(json!({
            "eth/usd": { "type": "constant", "value": 2000.0 },
            "USD/ETH": {
                "type": "invert",
                "source": { "type": "reference", "model": "ETH/USD" }
            }
        })))
        .unwrap();

        assert_eq!(graph.keys().collect::<Vec<_>>(), vec!["ETH/USD", "USD/ETH"]);
    }

    #[test]
    fn test_duplicate_model_names() {
        let result = build_graph(&config(json!({
            "eth/usd": { "type": "constant", "value": 1.0 },
            "ETH/USD": { "type": "constant", "value": 2.0 }
        })));
        assert!(matches!(result, Err(GraphError::DuplicateModel(name)) if name == "ETH/USD"));
    }

    #[test]
    fn test_rejected_cycle_is_released() {
        let config = config(json!({
            "A/B": { "type": "invert", "source": { "type": "reference", "model": "B/A" } },
            "B/A": { "type": "invert", "source": { "type": "reference", "model": "A/B" } }
        }));
        let placeholders = placeholders(&config).unwrap();
        let weak = Arc::downgrade(&placeholders["A/B"]);

        let result = build_with(&config, &placeholders);
        assert!(matches!(result, Err(GraphError::Cycle(_))));
        assert!(placeholders.values().all(|p| !p.is_attached()));

        drop(result);
        drop(placeholders);
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_loaded_file_resolves_references() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[models."ETH/USD"]
type = "constant"
value = 2000.0

[models."USD/ETH"]
type = "invert"
source = {{ type = "reference", model = "ETH/USD" }}
"#
        )
        .unwrap();

        let config = GraphConfig::load(file.path()).unwrap();
        let graph = build_graph(&config).unwrap();
        assert_eq!(graph.keys().collect::<Vec<_>>(), vec!["ETH/USD", "USD/ETH"]);
        assert_eq!(graph["ETH/USD"].data_point().number(), Ok(2000.0));
    }

    #[test]
    fn test_invalid_origin_thresholds() {
        let result = build_graph(&config(json!({
            "A/B": {
                "type": "origin",
                "origin": "a",
                "query": "A/B",
                "freshness_threshold_secs": 600,
                "expiry_threshold_secs": 60
            }
        })));
        assert!(matches!(result, Err(GraphError::InvalidThreshold { .. })));
    }
}
