//! Values produced by graph nodes

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DataError, DataResult, Pair};

/// Priced observation for a pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub pair: Pair,
    pub price: f64,
    /// 24h volume in base asset units
    #[serde(rename = "volume24h", default)]
    pub volume: Option<f64>,
}

impl Tick {
    pub fn new(pair: Pair, price: f64) -> Self {
        Self {
            pair,
            price,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn validate(&self) -> DataResult<()> {
        if self.pair.is_empty() {
            return Err(DataError::InvalidTick("pair is not set".to_string()));
        }
        if !self.price.is_finite() {
            return Err(DataError::InvalidTick(format!("price is not finite: {}", self.price)));
        }
        if self.price <= 0.0 {
            return Err(DataError::InvalidTick(format!(
                "price must be greater than zero: {}",
                self.price
            )));
        }
        if let Some(volume) = self.volume {
            if !volume.is_finite() || volume < 0.0 {
                return Err(DataError::InvalidTick(format!("invalid volume: {}", volume)));
            }
        }
        Ok(())
    }

    /// Inverted tick. A zero price only has its pair swapped.
    pub fn invert(&self) -> Self {
        let pair = self.pair.invert();
        if self.price == 0.0 {
            return Self {
                pair,
                price: self.price,
                volume: self.volume,
            };
        }

        let price = 1.0 / self.price;
        Self {
            pair,
            price,
            volume: self.volume.map(|v| v / price),
        }
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.pair, self.price)?;
        if let Some(volume) = self.volume {
            write!(f, " (vol {})", volume)?;
        }
        Ok(())
    }
}

/// Result of a computation step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Tick(Tick),
    Number(f64),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Tick(_) => "tick",
            Value::Number(_) => "number",
        }
    }

    /// Numeric view of the value; a tick is represented by its price.
    pub fn number(&self) -> f64 {
        match self {
            Value::Tick(tick) => tick.price,
            Value::Number(n) => *n,
        }
    }

    pub fn as_tick(&self) -> Option<&Tick> {
        match self {
            Value::Tick(tick) => Some(tick),
            Value::Number(_) => None,
        }
    }

    pub fn validate(&self) -> DataResult<()> {
        match self {
            Value::Tick(tick) => tick.validate(),
            Value::Number(n) if !n.is_finite() => Err(DataError::InvalidNumber(*n)),
            Value::Number(_) => Ok(()),
        }
    }
}

impl From<Tick> for Value {
    fn from(tick: Tick) -> Self {
        Value::Tick(tick)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Tick(tick) => tick.fmt(f),
            Value::Number(n) => write!(f, "{}", n),
        }
    }
}
