//! Origin leaf: cached data from an external market-data source

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;

use pricegraph_core::{
    type_meta, DataError, DataResult, GraphError, GraphResult, Meta, Point, Query,
};

use crate::node::{Node, NodeId, NodeRef};

/// Leaf node holding the last point fetched for `query` from `origin`.
///
/// The cached point is written only by the updater and replaced wholesale.
pub struct OriginNode {
    id: NodeId,
    origin: String,
    query: Query,
    freshness_threshold: Duration,
    expiry_threshold: Duration,
    point: RwLock<Option<Point>>,
}

impl OriginNode {
    /// Points younger than `freshness_threshold` are reused without a refetch;
    /// points older than `expiry_threshold` are reported as expired.
    pub fn new(
        origin: impl Into<String>,
        query: impl Into<Query>,
        freshness_threshold: Duration,
        expiry_threshold: Duration,
    ) -> GraphResult<Self> {
        if freshness_threshold > expiry_threshold {
            return Err(GraphError::InvalidThreshold {
                freshness_secs: freshness_threshold.as_secs(),
                expiry_secs: expiry_threshold.as_secs(),
            });
        }

        Ok(Self {
            id: NodeId::new(),
            origin: origin.into(),
            query: query.into(),
            freshness_threshold,
            expiry_threshold,
            point: RwLock::new(None),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn freshness_threshold(&self) -> Duration {
        self.freshness_threshold
    }

    pub fn expiry_threshold(&self) -> Duration {
        self.expiry_threshold
    }

    /// A point exists and is younger than the freshness threshold.
    pub fn is_fresh(&self) -> bool {
        let point = self.point.read();
        Self::fresh(point.as_ref(), self.freshness_threshold, Utc::now())
    }

    /// A point exists and is older than the expiry threshold.
    pub fn is_expired(&self) -> bool {
        let point = self.point.read();
        point
            .as_ref()
            .and_then(|p| p.time)
            .map(|time| age(time, Utc::now()) > self.expiry_threshold)
            .unwrap_or(false)
    }

    /// Replace the cached point. Rejects invalid points and points older
    /// than the cached one.
    pub fn set_data_point(&self, point: Point) -> DataResult<()> {
        let mut slot = self.point.write();
        Self::check(slot.as_ref(), &point)?;
        *slot = Some(point);
        Ok(())
    }

    /// Like [`set_data_point`](Self::set_data_point), but leaves a fresh
    /// cached point untouched. Returns whether the point was stored.
    pub fn refresh(&self, point: Point) -> DataResult<bool> {
        let mut slot = self.point.write();
        if Self::fresh(slot.as_ref(), self.freshness_threshold, Utc::now()) {
            return Ok(false);
        }
        Self::check(slot.as_ref(), &point)?;
        *slot = Some(point);
        Ok(true)
    }

    fn fresh(point: Option<&Point>, threshold: Duration, now: DateTime<Utc>) -> bool {
        point
            .and_then(|p| p.time)
            .map(|time| age(time, now) < threshold)
            .unwrap_or(false)
    }

    fn check(current: Option<&Point>, point: &Point) -> DataResult<()> {
        point.validate()?;
        if let (Some(cached), Some(new)) = (current.and_then(|p| p.time), point.time) {
            if new < cached {
                return Err(DataError::Outdated);
            }
        }
        Ok(())
    }
}

fn age(time: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    // Timestamps from the future count as brand new.
    (now - time).to_std().unwrap_or_default()
}

impl Node for OriginNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn nodes(&self) -> Vec<NodeRef> {
        vec![]
    }

    fn add_nodes(&self, nodes: &[NodeRef]) -> GraphResult<()> {
        if nodes.is_empty() {
            return Ok(());
        }
        Err(GraphError::Arity { node: "origin", max: 0 })
    }

    fn data_point(&self) -> Point {
        let Some(mut point) = self.point.read().clone() else {
            return Point::from_error(DataError::NotSet).with_meta(self.meta());
        };

        let mut meta = std::mem::take(&mut point.meta);
        meta.extend(self.meta());
        point.meta = meta;

        if let Some(time) = point.time {
            let age = age(time, Utc::now());
            if age > self.expiry_threshold && point.error.is_none() {
                point.error = Some(DataError::Expired {
                    age_secs: age.as_secs(),
                    expiry_secs: self.expiry_threshold.as_secs(),
                });
            }
        }
        point
    }

    fn meta(&self) -> Meta {
        let mut meta = type_meta("origin");
        meta.insert("origin".to_string(), self.origin.clone().into());
        meta.insert("query".to_string(), self.query.to_string().into());
        meta.insert(
            "freshness_threshold".to_string(),
            self.freshness_threshold.as_secs().into(),
        );
        meta.insert(
            "expiry_threshold".to_string(),
            self.expiry_threshold.as_secs().into(),
        );
        meta
    }

    fn as_origin(self: Arc<Self>) -> Option<Arc<OriginNode>> {
        Some(self)
    }
}
