//! Data points: the result envelope of every graph node
//!
//! A point is carried through the graph even when it is invalid, so a read
//! always returns the full tree of inputs together with the reasons why any
//! of them failed.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

use crate::{DataError, DataResult, Tick, Value};

/// Free-form diagnostic attributes
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Meta with only the `type` key set
pub fn type_meta(kind: &str) -> Meta {
    let mut meta = Meta::new();
    meta.insert("type".to_string(), serde_json::Value::from(kind));
    meta
}

/// Timestamped, validatable, error-carrying value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Point {
    pub value: Option<Value>,
    pub time: Option<DateTime<Utc>>,
    pub meta: Meta,
    pub sub_points: Vec<Point>,
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<DataError>,
}

impl Point {
    pub fn from_value(value: impl Into<Value>, time: DateTime<Utc>) -> Self {
        Self {
            value: Some(value.into()),
            time: Some(time),
            ..Default::default()
        }
    }

    pub fn from_error(error: DataError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta;
        self
    }

    pub fn with_sub_points(mut self, sub_points: Vec<Point>) -> Self {
        self.sub_points = sub_points;
        self
    }

    pub fn with_error(mut self, error: DataError) -> Self {
        self.error = Some(error);
        self
    }

    /// Returns the first rule the point breaks, if any.
    pub fn validate(&self) -> DataResult<()> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let value = self.value.as_ref().ok_or(DataError::MissingValue)?;
        value.validate()?;
        if self.time.is_none() {
            return Err(DataError::MissingTime);
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn tick(&self) -> DataResult<&Tick> {
        match &self.value {
            Some(Value::Tick(tick)) => Ok(tick),
            Some(other) => Err(DataError::UnexpectedValue {
                expected: "tick",
                got: other.kind().to_string(),
            }),
            None => Err(DataError::MissingValue),
        }
    }

    pub fn number(&self) -> DataResult<f64> {
        self.value
            .as_ref()
            .map(Value::number)
            .ok_or(DataError::MissingValue)
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(error) = &self.error {
            return write!(f, "error: {}", error);
        }
        match (&self.value, &self.time) {
            (Some(value), Some(time)) => write!(f, "{} @ {}", value, time.to_rfc3339()),
            (Some(value), None) => write!(f, "{} @ <no time>", value),
            (None, _) => f.write_str("<empty>"),
        }
    }
}

fn serialize_error<S: Serializer>(error: &Option<DataError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.collect_str(error),
        None => serializer.serialize_none(),
    }
}
