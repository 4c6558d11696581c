//! Informational mirror of a graph subtree

use serde::{Deserialize, Serialize};

use crate::Meta;

/// Describes how a value would be computed. Never used to compute one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub meta: Meta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<Model>,
}

impl Model {
    pub fn new(meta: Meta, models: Vec<Model>) -> Self {
        Self { meta, models }
    }

    /// Number of models in this tree, including itself
    pub fn size(&self) -> usize {
        1 + self.models.iter().map(Model::size).sum::<usize>()
    }

    pub fn is_leaf(&self) -> bool {
        self.models.is_empty()
    }
}
