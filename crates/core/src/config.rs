//! Configuration types

use config::{Config, Environment};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::{GraphError, GraphResult, Meta, Pair};

/// Environment variable prefix for graph overrides, e.g. `PRICEGRAPH__ORIGIN_DEFAULTS__EXPIRY_THRESHOLD_SECS`
pub const ENV_PREFIX: &str = "PRICEGRAPH";

/// Updater configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Upper bound for a single origin's batched fetch
    pub fetch_timeout_ms: u64,
}

impl UpdaterConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 10_000,
        }
    }
}

/// TTLs applied to origin nodes that do not set their own
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OriginDefaults {
    pub freshness_threshold_secs: u64,
    pub expiry_threshold_secs: u64,
}

impl Default for OriginDefaults {
    fn default() -> Self {
        Self {
            freshness_threshold_secs: 60,
            expiry_threshold_secs: 300,
        }
    }
}

/// Definition of a single graph node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeConfig {
    Origin {
        origin: String,
        query: String,
        #[serde(default)]
        freshness_threshold_secs: Option<u64>,
        #[serde(default)]
        expiry_threshold_secs: Option<u64>,
    },
    Median {
        min: usize,
        sources: Vec<NodeConfig>,
    },
    Indirect {
        sources: Vec<NodeConfig>,
    },
    Deviation {
        value: Box<NodeConfig>,
        reference: Box<NodeConfig>,
        threshold: Box<NodeConfig>,
    },
    Alias {
        pair: Pair,
        source: Box<NodeConfig>,
    },
    Invert {
        source: Box<NodeConfig>,
    },
    /// Points at another model by name
    Reference {
        model: String,
    },
    Wrapper {
        #[serde(default)]
        meta: Meta,
        source: Box<NodeConfig>,
    },
    Constant {
        value: f64,
    },
}

/// Complete graph definition: model name to root node
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphConfig {
    #[serde(default)]
    pub origin_defaults: OriginDefaults,
    #[serde(default)]
    pub models: BTreeMap<String, NodeConfig>,
}

impl GraphConfig {
    /// Load from a file (format picked by extension), then apply
    /// `PRICEGRAPH__` environment overrides.
    ///
    /// Model definitions are parsed straight from the file so model names
    /// keep their case; only `origin_defaults` can be overridden.
    pub fn load(path: impl AsRef<Path>) -> GraphResult<Self> {
        let path = path.as_ref();
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;

        Self::parse(&content, format)?.with_overrides(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
    }

    pub fn parse(content: &str, format: ConfigFormat) -> GraphResult<Self> {
        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| e.to_string()),
        };
        parsed.map_err(GraphError::Parse)
    }

    /// Apply `origin_defaults` overrides from an environment source.
    pub fn with_overrides(mut self, env: Environment) -> GraphResult<Self> {
        let overrides: Overrides = Config::builder().add_source(env).build()?.try_deserialize()?;

        let defaults = &mut self.origin_defaults;
        if let Some(secs) = overrides.origin_defaults.freshness_threshold_secs {
            defaults.freshness_threshold_secs = secs;
        }
        if let Some(secs) = overrides.origin_defaults.expiry_threshold_secs {
            defaults.expiry_threshold_secs = secs;
        }
        Ok(self)
    }

    pub fn model_names(&self) -> Vec<&str> {
        self.models.keys().map(String::as_str).collect()
    }
}

/// Supported graph definition formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> GraphResult<Self> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") => Ok(Self::Json),
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            _ => Err(GraphError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct Overrides {
    #[serde(default)]
    origin_defaults: DefaultsOverride,
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsOverride {
    #[serde(default)]
    freshness_threshold_secs: Option<u64>,
    #[serde(default)]
    expiry_threshold_secs: Option<u64>,
}
