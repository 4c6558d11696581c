//! Multi-hop conversion through intermediate pairs

use parking_lot::RwLock;
use std::sync::Arc;

use pricegraph_core::{type_meta, DataError, DataResult, GraphResult, Meta, Pair, Point, Tick};

use crate::node::{failed, Node, NodeId, NodeRef};

/// Chains its children's ticks into a single cross rate.
///
/// Children are hops in order. Each hop may face either way, e.g.
/// `BTC/ETH` and `USD/ETH` resolve to `BTC/USD`.
pub struct IndirectNode {
    id: NodeId,
    nodes: RwLock<Vec<NodeRef>>,
}

impl IndirectNode {
    pub fn new() -> Self {
        Self {
            id: NodeId::new(),
            nodes: RwLock::new(vec![]),
        }
    }
}

impl Default for IndirectNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for IndirectNode {
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

        if points.is_empty() {
            return failed(DataError::NoChild, self.meta(), points);
        }

        if points.len() == 1 {
            let hop = &points[0];
            return Point {
                value: hop.value.clone(),
                time: hop.time,
                error: hop.error.clone(),
                meta: self.meta(),
                sub_points: points,
            };
        }

        let ticks = match hops(&points) {
            Ok(ticks) => ticks,
            Err(e) => return failed(e, self.meta(), points),
        };

        match cross_rate(ticks) {
            Ok(tick) => Point {
                value: Some(tick.into()),
                time: points.iter().filter_map(|p| p.time).min(),
                meta: self.meta(),
                sub_points: points,
                error: None,
            },
            Err(e) => failed(e, self.meta(), points),
        }
    }

    fn meta(&self) -> Meta {
        type_meta("indirect")
    }
}

/// Validated ticks of every hop; the first invalid hop fails the chain.
fn hops(points: &[Point]) -> DataResult<Vec<Tick>> {
    points
        .iter()
        .map(|p| {
            p.validate()?;
            p.tick().cloned()
        })
        .collect()
}

/// Fold consecutive hops into one tick, aligning each hop's direction.
fn cross_rate(ticks: Vec<Tick>) -> DataResult<Tick> {
    let mut hops = ticks.into_iter();
    let mut acc = hops.next().ok_or(DataError::NoChild)?;

    for next in hops {
        let (a, b) = (&acc.pair, &next.pair);
        let (pair, price) = if a.quote == b.base {
            // A/C, C/B
            (Pair::new(&a.base, &b.quote), acc.price * next.price)
        } else if a.quote == b.quote {
            // A/C, B/C
            (Pair::new(&a.base, &b.base), acc.price / next.price)
        } else if a.base == b.base {
            // C/A, C/B
            (Pair::new(&a.quote, &b.quote), next.price / acc.price)
        } else if a.base == b.quote {
            // C/A, B/C
            (Pair::new(&a.quote, &b.base), 1.0 / (acc.price * next.price))
        } else {
            return Err(DataError::NotContiguous {
                left: a.clone(),
                right: b.clone(),
            });
        };

        acc = Tick::new(pair, price);
    }

    Ok(acc)
}
