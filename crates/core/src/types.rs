//! Core type definitions

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::DataError;

/// Ordered asset pair, e.g. `BTC/USD`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Pair {
    pub base: String,
    pub quote: String,
}

impl Pair {
    /// Symbols are normalized to uppercase.
    pub fn new(base: &str, quote: &str) -> Self {
        Self {
            base: base.trim().to_uppercase(),
            quote: quote.trim().to_uppercase(),
        }
    }

    /// Swap base and quote
    pub fn invert(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty() || self.quote.is_empty()
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for Pair {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (base, quote) = s
            .split_once('/')
            .ok_or_else(|| DataError::InvalidPair(s.to_string()))?;

        let pair = Pair::new(base, quote);
        if pair.is_empty() || pair.quote.contains('/') {
            return Err(DataError::InvalidPair(s.to_string()));
        }
        Ok(pair)
    }
}

/// Canonical model name. Pair-shaped names take the `BASE/QUOTE` uppercase
/// form so `btc/usd` and `BTC/USD` name the same model; other names are only
/// trimmed.
pub fn model_key(name: &str) -> String {
    match name.parse::<Pair>() {
        Ok(pair) => pair.to_string(),
        Err(_) => name.trim().to_string(),
    }
}

impl Serialize for Pair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Opaque lookup key understood by a single origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Query {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for Query {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl From<&Pair> for Query {
    fn from(pair: &Pair) -> Self {
        Self(pair.to_string())
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
