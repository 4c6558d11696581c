//! Origin refresh
//!
//! The updater refreshes stale origin nodes with one batched fetch per
//! origin. Each origin runs as its own task, so a slow, failing or panicking
//! origin only affects its own nodes.

use futures::FutureExt;
use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::{self, JoinSet};
use tracing::{debug, error, warn};

use pricegraph_core::{OriginError, Point, Query, UpdateError, UpdateResult, UpdaterConfig};
use pricegraph_graph::{Node, OriginNode};

use crate::origin::Origin;

type Batch = HashMap<Query, Vec<Arc<OriginNode>>>;

/// Refreshes origin nodes from their registered origins
pub struct Updater {
    config: UpdaterConfig,
    origins: HashMap<String, Arc<dyn Origin>>,
}

impl Updater {
    pub fn new(config: UpdaterConfig) -> Self {
        Self {
            config,
            origins: HashMap::new(),
        }
    }

    /// Register an origin under the name origin nodes refer to.
    pub fn with_origin(mut self, name: impl Into<String>, origin: Arc<dyn Origin>) -> Self {
        self.origins.insert(name.into(), origin);
        self
    }

    /// Sorted names of registered origins
    pub fn origin_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.origins.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Refresh every node in `nodes` whose cached point is missing or older
    /// than its freshness threshold.
    ///
    /// Origin failures are logged and leave the affected nodes untouched;
    /// they show up as errors when the nodes are read. The only error
    /// returned is a node naming an unregistered origin, in which case
    /// nothing is fetched. Dropping the returned future aborts in-flight
    /// fetches.
    pub async fn update(&self, nodes: &[Arc<OriginNode>]) -> UpdateResult<UpdateStats> {
        if let Some(node) = nodes.iter().find(|n| !self.origins.contains_key(n.origin())) {
            return Err(UpdateError::UnknownOrigin(node.origin().to_string()));
        }

        let batches = self.stale_batches(nodes);
        let mut stats = UpdateStats {
            origins: batches.len(),
            queries: batches.values().map(HashMap::len).sum(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        let mut names: HashMap<task::Id, String> = HashMap::new();
        for (name, batch) in batches {
            let origin = Arc::clone(&self.origins[&name]);
            let timeout = self.config.fetch_timeout();
            let timeout_ms = self.config.fetch_timeout_ms;

            debug!("Fetching {} queries from {}", batch.len(), name);
            let task_name = name.clone();
            let handle = tasks.spawn(async move {
                let queries: Vec<Query> = batch.keys().cloned().collect();
                // The call itself happens inside the guarded future, so a
                // panic before the first await is caught as well.
                let fetch = AssertUnwindSafe(async { origin.fetch_data_points(&queries).await })
                    .catch_unwind();
                let result = match tokio::time::timeout(timeout, fetch).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(panic)) => Err(OriginError::Panicked(panic_message(panic))),
                    Err(_) => Err(OriginError::Timeout(timeout_ms)),
                };
                (task_name, batch, result)
            });
            names.insert(handle.id(), name);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (name, batch, result) = match joined {
                Ok((_, done)) => done,
                Err(e) => {
                    let name = names.remove(&e.id()).unwrap_or_default();
                    error!("Origin {} task failed: {}", name, e);
                    stats.failed_origins.push(name);
                    continue;
                }
            };

            match result {
                Ok(points) => stats.updated_nodes += store(&name, &batch, points),
                Err(OriginError::Panicked(message)) => {
                    error!("Origin {} panicked while fetching: {}", name, message);
                    stats.failed_origins.push(name);
                }
                Err(e) => {
                    warn!("Unable to fetch {} queries from {}: {}", batch.len(), name, e);
                    stats.failed_origins.push(name);
                }
            }
        }
        stats.failed_origins.sort_unstable();

        debug!(
            "Update finished: {} origins, {} queries, {} nodes updated, {} origins failed",
            stats.origins,
            stats.queries,
            stats.updated_nodes,
            stats.failed_origins.len()
        );
        Ok(stats)
    }

    /// Stale nodes grouped by origin, then by query
    fn stale_batches(&self, nodes: &[Arc<OriginNode>]) -> HashMap<String, Batch> {
        let mut seen = HashSet::new();
        let mut batches: HashMap<String, Batch> = HashMap::new();

        for node in nodes {
            if !seen.insert(node.id()) || node.is_fresh() {
                continue;
            }
            batches
                .entry(node.origin().to_string())
                .or_default()
                .entry(node.query().clone())
                .or_default()
                .push(Arc::clone(node));
        }
        batches
    }
}

/// Write fetched points into every node waiting on their query.
fn store(origin: &str, batch: &Batch, points: HashMap<Query, Point>) -> usize {
    let mut updated = 0;

    let answered = points.len();
    if answered < batch.len() {
        debug!("Origin {} answered {} of {} queries", origin, answered, batch.len());
    }

    for (query, point) in points {
        let Some(nodes) = batch.get(&query) else {
            debug!("Origin {} returned unrequested query {}", origin, query);
            continue;
        };

        for node in nodes {
            match node.refresh(point.clone()) {
                Ok(true) => updated += 1,
                Ok(false) => debug!("Skipping fresh node {}:{}", origin, query),
                Err(e) => warn!("Rejected point for {}:{}: {}", origin, query, e),
            }
        }
    }

    updated
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Outcome of a single update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Origins with at least one stale node
    pub origins: usize,
    /// Distinct queries sent across all origins
    pub queries: usize,
    pub updated_nodes: usize,
    /// Sorted names of origins whose fetch failed, timed out or panicked
    pub failed_origins: Vec<String>,
}

impl UpdateStats {
    pub fn is_noop(&self) -> bool {
        self.origins == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::origin::StaticOrigin;
    use async_trait::async_trait;
    use chrono::{Duration as TimeDelta, Utc};
    use pricegraph_core::{DataError, OriginResult, Pair, Tick};
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts calls and queries, then delegates to a static origin
    struct CountingOrigin {
        inner: StaticOrigin,
        calls: AtomicUsize,
        queries: AtomicUsize,
    }

    impl CountingOrigin {
        fn new(inner: StaticOrigin) -> Self {
            Self {
                inner,
                calls: AtomicUsize::new(0),
                queries: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Origin for CountingOrigin {
        async fn fetch_data_points(&self, queries: &[Query]) -> OriginResult<HashMap<Query, Point>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries.fetch_add(queries.len(), Ordering::SeqCst);
            self.inner.fetch_data_points(queries).await
        }
    }

    struct PanickingOrigin;

    #[async_trait]
    impl Origin for PanickingOrigin {
        async fn fetch_data_points(&self, _queries: &[Query]) -> OriginResult<HashMap<Query, Point>> {
            panic!("connector bug");
        }
    }

    struct FailingOrigin;

    #[async_trait]
    impl Origin for FailingOrigin {
        async fn fetch_data_points(&self, _queries: &[Query]) -> OriginResult<HashMap<Query, Point>> {
            Err(OriginError::Fetch("connection refused".to_string()))
        }
    }

    /// Panics while building its future, before anything is awaited
    struct EagerPanickingOrigin;

    impl Origin for EagerPanickingOrigin {
        fn fetch_data_points<'life0, 'life1, 'async_trait>(
            &'life0 self,
            _queries: &'life1 [Query],
        ) -> Pin<Box<dyn Future<Output = OriginResult<HashMap<Query, Point>>> + Send + 'async_trait>>
        where
            'life0: 'async_trait,
            'life1: 'async_trait,
            Self: 'async_trait,
        {
            panic!("bad request builder");
        }
    }

    /// Sets the flag when dropped
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct SlowOrigin {
        started: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Origin for SlowOrigin {
        async fn fetch_data_points(&self, _queries: &[Query]) -> OriginResult<HashMap<Query, Point>> {
            self.started.store(true, Ordering::SeqCst);
            let _guard = DropFlag(Arc::clone(&self.dropped));
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(HashMap::new())
        }
    }

    fn node(origin: &str, query: &str) -> Arc<OriginNode> {
        Arc::new(
            OriginNode::new(origin, query, Duration::from_secs(60), Duration::from_secs(300))
                .unwrap(),
        )
    }

    fn prices() -> StaticOrigin {
        StaticOrigin::new()
            .with_price(Pair::new("BTC", "USD"), 20_000.0)
            .with_price(Pair::new("ETH", "USD"), 1_000.0)
    }

    #[tokio::test]
    async fn test_update_fetches_stale_nodes() {
        let origin = Arc::new(CountingOrigin::new(prices()));
        let updater = Updater::new(UpdaterConfig::default()).with_origin("a", origin.clone());

        let btc = node("a", "BTC/USD");
        let eth = node("a", "ETH/USD");
        let stats = updater.update(&[btc.clone(), eth.clone()]).await.unwrap();

        assert_eq!(stats.origins, 1);
        assert_eq!(stats.queries, 2);
        assert_eq!(stats.updated_nodes, 2);
        assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
        assert_eq!(btc.data_point().tick().unwrap().price, 20_000.0);
        assert_eq!(eth.data_point().tick().unwrap().price, 1_000.0);
    }

    #[tokio::test]
    async fn test_shared_query_updates_every_node() {
        let origin = Arc::new(CountingOrigin::new(prices()));
        let updater = Updater::new(UpdaterConfig::default()).with_origin("a", origin.clone());

        let first = node("a", "BTC/USD");
        let second = node("a", "BTC/USD");
        let stats = updater
            .update(&[first.clone(), second.clone(), first.clone()])
            .await
            .unwrap();

        assert_eq!(stats.queries, 1);
        assert_eq!(stats.updated_nodes, 2);
        assert_eq!(origin.queries.load(Ordering::SeqCst), 1);
        assert!(first.data_point().is_valid());
        assert!(second.data_point().is_valid());
    }

    #[tokio::test]
    async fn test_fresh_nodes_are_not_refetched() {
        let origin = Arc::new(CountingOrigin::new(prices()));
        let updater = Updater::new(UpdaterConfig::default()).with_origin("a", origin.clone());
        let btc = node("a", "BTC/USD");

        updater.update(&[btc.clone()]).await.unwrap();
        let first = btc.data_point();

        origin.inner.set(
            Query::from("BTC/USD"),
            Tick::new(Pair::new("BTC", "USD"), 1.0),
        );
        for _ in 0..3 {
            let stats = updater.update(&[btc.clone()]).await.unwrap();
            assert!(stats.is_noop());
        }

        assert_eq!(origin.calls.load(Ordering::SeqCst), 1);
        assert_eq!(btc.data_point(), first);
    }

    #[tokio::test]
    async fn test_stale_nodes_are_refetched() {
        let origin = Arc::new(CountingOrigin::new(prices()));
        let updater = Updater::new(UpdaterConfig::default()).with_origin("a", origin.clone());
        let btc = node("a", "BTC/USD");

        let old = Tick::new(Pair::new("BTC", "USD"), 10_000.0);
        btc.set_data_point(Point::from_value(old, Utc::now() - TimeDelta::seconds(120)))
            .unwrap();

        updater.update(&[btc.clone()]).await.unwrap();
        assert_eq!(btc.data_point().tick().unwrap().price, 20_000.0);
    }

    #[tokio::test]
    async fn test_panicking_origin_is_isolated() {
        let updater = Updater::new(UpdaterConfig::default())
            .with_origin("good", Arc::new(prices()))
            .with_origin("bad", Arc::new(PanickingOrigin));

        let good = node("good", "BTC/USD");
        let bad = node("bad", "BTC/USD");
        let stats = updater.update(&[good.clone(), bad.clone()]).await.unwrap();

        assert_eq!(stats.failed_origins, vec!["bad".to_string()]);
        assert!(good.data_point().is_valid());
        assert_eq!(bad.data_point().error, Some(DataError::NotSet));
    }

    #[tokio::test]
    async fn test_failing_origin_keeps_previous_point() {
        let updater = Updater::new(UpdaterConfig::default()).with_origin("a", Arc::new(FailingOrigin));
        let btc = node("a", "BTC/USD");

        let old = Point::from_value(
            Tick::new(Pair::new("BTC", "USD"), 10_000.0),
            Utc::now() - TimeDelta::seconds(120),
        );
        btc.set_data_point(old).unwrap();

        let stats = updater.update(&[btc.clone()]).await.unwrap();
        assert_eq!(stats.failed_origins, vec!["a".to_string()]);
        assert_eq!(btc.data_point().tick().unwrap().price, 10_000.0);
    }

    #[tokio::test]
    async fn test_missing_query_leaves_node_unset() {
        let updater = Updater::new(UpdaterConfig::default()).with_origin("a", Arc::new(prices()));
        let unknown = node("a", "XAU/USD");

        let stats = updater.update(&[unknown.clone()]).await.unwrap();
        assert_eq!(stats.updated_nodes, 0);
        assert_eq!(unknown.data_point().error, Some(DataError::NotSet));
    }

    #[tokio::test]
    async fn test_unknown_origin_is_rejected() {
        let origin = Arc::new(CountingOrigin::new(prices()));
        let updater = Updater::new(UpdaterConfig::default()).with_origin("a", origin.clone());

        let result = updater.update(&[node("a", "BTC/USD"), node("b", "BTC/USD")]).await;
        assert!(matches!(result, Err(UpdateError::UnknownOrigin(name)) if name == "b"));
        assert_eq!(origin.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_slow_origin_times_out() {
        let config = UpdaterConfig { fetch_timeout_ms: 100 };
        let updater = Updater::new(config)
            .with_origin("slow", Arc::new(SlowOrigin::default()))
            .with_origin("fast", Arc::new(prices()));

        let slow = node("slow", "BTC/USD");
        let fast = node("fast", "BTC/USD");
        let stats = updater.update(&[slow.clone(), fast.clone()]).await.unwrap();

        assert_eq!(stats.failed_origins, vec!["slow".to_string()]);
        assert!(fast.data_point().is_valid());
        assert_eq!(slow.data_point().error, Some(DataError::NotSet));
    }

    #[tokio::test]
    async fn test_eager_panic_names_origin() {
        let updater = Updater::new(UpdaterConfig::default())
            .with_origin("good", Arc::new(prices()))
            .with_origin("eager", Arc::new(EagerPanickingOrigin));

        let good = node("good", "BTC/USD");
        let eager = node("eager", "BTC/USD");
        let stats = updater.update(&[good.clone(), eager.clone()]).await.unwrap();

        assert_eq!(stats.failed_origins, vec!["eager".to_string()]);
        assert!(good.data_point().is_valid());
        assert_eq!(eager.data_point().error, Some(DataError::NotSet));
    }

    #[tokio::test]
    async fn test_cancelled_update_aborts_fetches() {
        let origin = Arc::new(SlowOrigin::default());
        let updater = Updater::new(UpdaterConfig::default()).with_origin("slow", origin.clone());
        let btc = node("slow", "BTC/USD");

        let old = Point::from_value(
            Tick::new(Pair::new("BTC", "USD"), 10_000.0),
            Utc::now() - TimeDelta::seconds(120),
        );
        btc.set_data_point(old.clone()).unwrap();

        let result = tokio::time::timeout(Duration::from_millis(50), updater.update(&[btc.clone()])).await;
        assert!(result.is_err());
        assert!(origin.started.load(Ordering::SeqCst));

        // Aborted tasks are dropped the next time the runtime gets to them.
        for _ in 0..100 {
            if origin.dropped.load(Ordering::SeqCst) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(origin.dropped.load(Ordering::SeqCst));
        assert_eq!(btc.data_point().tick().unwrap().price, 10_000.0);
        assert_eq!(btc.data_point().time, old.time);
    }

    #[test]
    fn test_origin_names_sorted() {
        let updater = Updater::new(UpdaterConfig::default())
            .with_origin("kraken", Arc::new(StaticOrigin::new()))
            .with_origin("binance", Arc::new(StaticOrigin::new()));
        assert_eq!(updater.origin_names(), vec!["binance", "kraken"]);
    }
}
