use crate::{
    CollectFuture,
    Collector,
    DataKind,
    Deadline,
    Metrics,
};
use cluster_report_config::Node;
use std::{
    collections::HashMap,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::RwLock,
    time::Instant,
};

struct CacheEntry {
    metrics: Metrics,
    stored_at: Instant,
}

/// Memoizes another collector's metrics per node for `ttl`.
///
/// Only successful collections are stored. The decorator keeps the inner collector's name so
/// that reports look the same with or without caching.
pub struct Cached {
    inner: Arc<dyn Collector>,
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl Cached {
    pub fn new(inner: Arc<dyn Collector>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(&self, node: &Node) -> String {
        format!("{}-{}", self.inner.name(), node.name)
    }

    async fn lookup(&self, key: &str) -> Option<Metrics> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.metrics.clone())
    }
}

impl Collector for Cached {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn kinds(&self) -> &[DataKind] {
        self.inner.kinds()
    }

    fn collect<'a>(&'a self, node: &'a Node, deadline: &'a Deadline) -> CollectFuture<'a> {
        Box::pin(async move {
            let key = self.key(node);
            if let Some(metrics) = self.lookup(&key).await {
                trace!(%key, "cache hit");
                return Ok(metrics);
            }

            let metrics = self.inner.collect(node, deadline).await?;

            let mut entries = self.entries.write().await;
            entries.insert(
                key,
                CacheEntry {
                    metrics: metrics.clone(),
                    stored_at: Instant::now(),
                },
            );
            Ok(metrics)
        })
    }
}
