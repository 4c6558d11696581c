//! Market-data origins
//!
//! An origin answers batches of queries with data points. Connectors for
//! individual exchanges implement [`Origin`]; the updater only ever talks to
//! this trait.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

use pricegraph_core::{OriginResult, Pair, Point, Query, Tick};

/// Batched access to an external market-data source.
///
/// Implementations may leave out queries they cannot answer and may return
/// results in any order. A panic is treated as a failure of the whole batch.
#[async_trait]
pub trait Origin: Send + Sync {
    async fn fetch_data_points(&self, queries: &[Query]) -> OriginResult<HashMap<Query, Point>>;
}

/// In-memory origin serving fixed prices, e.g. for pegged assets
#[derive(Debug, Default)]
pub struct StaticOrigin {
    ticks: RwLock<HashMap<Query, Tick>>,
}

impl StaticOrigin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `price` for `pair`, queried by the pair's `BASE/QUOTE` form.
    pub fn with_price(self, pair: Pair, price: f64) -> Self {
        self.set(Query::from(&pair), Tick::new(pair, price));
        self
    }

    pub fn set(&self, query: Query, tick: Tick) {
        self.ticks.write().insert(query, tick);
    }

    pub fn remove(&self, query: &Query) -> Option<Tick> {
        self.ticks.write().remove(query)
    }
}

#[async_trait]
impl Origin for StaticOrigin {
    async fn fetch_data_points(&self, queries: &[Query]) -> OriginResult<HashMap<Query, Point>> {
        let now = Utc::now();
        let ticks = self.ticks.read();

        Ok(queries
            .iter()
            .filter_map(|query| {
                let tick = ticks.get(query)?;
                Some((query.clone(), Point::from_value(tick.clone(), now)))
            })
            .collect())
    }
}
