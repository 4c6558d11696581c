//! Median across several sources of the same pair

use parking_lot::RwLock;
use std::sync::Arc;

use pricegraph_core::{type_meta, DataError, GraphError, GraphResult, Meta, Point, Tick};

use crate::node::{failed, Node, NodeId, NodeRef};

/// Median price of its children's ticks.
///
/// Invalid children are skipped, but at least `min` valid ticks must remain.
/// The reported time is the earliest time of all pulled points, valid or not.
pub struct MedianNode {
    id: NodeId,
    min: usize,
    nodes: RwLock<Vec<NodeRef>>,
}

impl MedianNode {
    pub fn new(min: usize) -> GraphResult<Self> {
        if min == 0 {
            return Err(GraphError::InvalidMin);
        }
        Ok(Self {
            id: NodeId::new(),
            min,
            nodes: RwLock::new(vec![]),
        })
    }

    pub fn min(&self) -> usize {
        self.min
    }
}

impl Node for MedianNode {
    fn id(&self) -> NodeId {
        self.id
    }

    fn nodes(&self) -> Vec<NodeRef> {
        self.nodes.read().clone()
    }

    fn add_nodes(&self, nodes: &[NodeRef]) -> GraphResult<()> {
        self.nodes.write().extend(nodes.iter().map(Arc::clone));
        Ok(())
    }

    fn data_point(&self) -> Point {
        let points: Vec<Point> = self.nodes().iter().map(|n| n.data_point()).collect();
        let time = points.iter().filter_map(|p| p.time).min();

        let mut ticks: Vec<&Tick> = Vec::with_capacity(points.len());
        for point in points.iter().filter(|p| p.is_valid()) {
            let tick = match point.tick() {
                Ok(tick) => tick,
                Err(e) => return failed(e, self.meta(), points.clone()),
            };
            if let Some(first) = ticks.first() {
                if first.pair != tick.pair {
                    let error = DataError::PairMismatch {
                        expected: first.pair.clone(),
                        got: tick.pair.clone(),
                    };
                    return failed(error, self.meta(), points.clone());
                }
            }
            ticks.push(tick);
        }

        if ticks.len() < self.min {
            let error = DataError::NotEnoughValues {
                got: ticks.len(),
                min: self.min,
            };
            return failed(error, self.meta(), points.clone());
        }

        let pair = ticks[0].pair.clone();
        let mut prices: Vec<f64> = ticks.iter().map(|t| t.price).collect();
        let price = median(&mut prices);

        Point {
            value: Some(Tick::new(pair, price).with_volume(0.0).into()),
            time,
            meta: self.meta(),
            sub_points: points,
            error: None,
        }
    }

    fn meta(&self) -> Meta {
        let mut meta = type_meta("median");
        meta.insert("min".to_string(), self.min.into());
        meta
    }
}

/// Median of a non-empty slice. Sorts in place.
fn median(prices: &mut [f64]) -> f64 {
    prices.sort_by(f64::total_cmp);
    let mid = prices.len() / 2;
    if prices.len() % 2 == 0 {
        (prices[mid - 1] + prices[mid]) / 2.0
    } else {
        prices[mid]
    }
}
