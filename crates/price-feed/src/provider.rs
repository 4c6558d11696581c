//! Price provider
//!
//! Read-side facade over a built graph. Every read refreshes the origins
//! under the requested models once, then pulls the roots.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tracing::debug;

use pricegraph_core::{model_key, Model, Point, ProviderError, ProviderResult};
use pricegraph_graph::{model, origin_nodes, Graph, Node, NodeRef};

use crate::updater::Updater;

/// Named price models
#[async_trait]
pub trait Provider: Send + Sync {
    /// Sorted model names
    fn model_names(&self) -> Vec<String>;

    /// Current data point of a single model. Pair-shaped names match
    /// regardless of case.
    async fn data_point(&self, name: &str) -> ProviderResult<Point>;

    /// Current data points of several models, refreshed together.
    async fn data_points(&self, names: &[&str]) -> ProviderResult<BTreeMap<String, Point>>;

    /// Structure of a single model
    fn model(&self, name: &str) -> ProviderResult<Model>;

    /// Structure of several models
    fn models(&self, names: &[&str]) -> ProviderResult<BTreeMap<String, Model>> {
        names
            .iter()
            .map(|name| Ok((name.to_string(), self.model(name)?)))
            .collect()
    }
}

/// [`Provider`] backed by a [`Graph`]
///
/// Without an updater the graph is only read; origin nodes must be fed by
/// other means (e.g. [`OriginNode::set_data_point`](pricegraph_graph::OriginNode::set_data_point)).
pub struct GraphProvider {
    graph: Graph,
    updater: Option<Updater>,
}

impl GraphProvider {
    pub fn new(graph: Graph, updater: Option<Updater>) -> Self {
        Self { graph, updater }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    fn roots(&self, names: &[&str]) -> ProviderResult<Vec<(String, NodeRef)>> {
        names
            .iter()
            .map(|name| {
                self.graph
                    .get(&model_key(name))
                    .map(|root| (name.to_string(), root.clone()))
                    .ok_or_else(|| ProviderError::ModelNotFound(name.to_string()))
            })
            .collect()
    }
}

#[async_trait]
impl Provider for GraphProvider {
    fn model_names(&self) -> Vec<String> {
        self.graph.keys().cloned().collect()
    }

    async fn data_point(&self, name: &str) -> ProviderResult<Point> {
        let mut points = self.data_points(&[name]).await?;
        points
            .remove(name)
            .ok_or_else(|| ProviderError::ModelNotFound(name.to_string()))
    }

    async fn data_points(&self, names: &[&str]) -> ProviderResult<BTreeMap<String, Point>> {
        let roots = self.roots(names)?;

        if let Some(updater) = &self.updater {
            let nodes: Vec<NodeRef> = roots.iter().map(|(_, root)| root.clone()).collect();
            let stats = updater.update(&origin_nodes(&nodes)).await?;
            if !stats.is_noop() {
                debug!("Refreshed {} origin nodes for {} models", stats.updated_nodes, names.len());
            }
        }

        Ok(roots
            .into_iter()
            .map(|(name, root)| (name, root.data_point()))
            .collect())
    }

    fn model(&self, name: &str) -> ProviderResult<Model> {
        self.graph
            .get(&model_key(name))
            .map(model)
            .ok_or_else(|| ProviderError::ModelNotFound(name.to_string()))
    }
}
