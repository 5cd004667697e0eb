use crate::{
    AggregateReport,
    CollectionResult,
    Collector,
    EngineError,
    NodeReport,
};
use chrono::{
    DateTime,
    Utc,
};
use cluster_report_config::Node;
use std::{
    collections::HashMap,
    sync::Arc,
};
use tokio::sync::mpsc;

/// Collects the results of one run and assembles them into an [`AggregateReport`].
///
/// The aggregator is the single consumer of the result channel and owns its state outright.
pub struct Aggregator {
    started_at: DateTime<Utc>,
    nodes: Vec<(String, String)>,
    collectors: Vec<String>,
    results: HashMap<(String, String), CollectionResult>,
    duplicates: Vec<(String, String)>,
    unknown: Vec<(String, String)>,
    received: usize,
}

impl Aggregator {
    pub fn new(nodes: &[Node], collectors: &[Arc<dyn Collector>]) -> Self {
        Self {
            started_at: Utc::now(),
            nodes: nodes
                .iter()
                .map(|node| (node.name.clone(), node.host.clone()))
                .collect(),
            collectors: collectors
                .iter()
                .map(|collector| collector.name().to_string())
                .collect(),
            results: HashMap::new(),
            duplicates: Vec::new(),
            unknown: Vec::new(),
            received: 0,
        }
    }

    pub fn expected(&self) -> usize {
        self.nodes.len() * self.collectors.len()
    }

    pub fn received(&self) -> usize {
        self.received
    }

    pub fn record(&mut self, result: CollectionResult) {
        self.received += 1;
        let key = (result.node.clone(), result.collector.clone());

        let known_node = self.nodes.iter().any(|(name, _)| *name == key.0);
        let known_collector = self.collectors.contains(&key.1);
        if !known_node || !known_collector {
            warn!(node = %key.0, collector = %key.1, "result for a pair that was never scheduled");
            self.unknown.push(key);
            return;
        }

        if self.results.contains_key(&key) {
            warn!(node = %key.0, collector = %key.1, "duplicate result");
            self.duplicates.push(key);
            return;
        }

        trace!(node = %key.0, collector = %key.1, success = result.success, "recorded result");
        self.results.insert(key, result);
    }

    /// Records everything sent on `results` until every sender is gone.
    pub async fn consume(&mut self, mut results: mpsc::Receiver<CollectionResult>) {
        while let Some(result) = results.recv().await {
            self.record(result);
        }
    }

    /// Validates that every scheduled pair reported exactly once and builds the report in node
    /// input order, with each node's results in collector order.
    pub fn finish(mut self) -> Result<AggregateReport, EngineError> {
        let expected = self.expected();
        let mut problems = Vec::new();

        if !self.duplicates.is_empty() {
            problems.push(format!("duplicates: {}", describe(&self.duplicates)));
        }
        if !self.unknown.is_empty() {
            problems.push(format!("unknown: {}", describe(&self.unknown)));
        }
        let missing: Vec<(String, String)> = self
            .pairs()
            .filter(|pair| !self.results.contains_key(pair))
            .collect();
        if !missing.is_empty() {
            problems.push(format!("missing: {}", describe(&missing)));
        }

        if self.received != expected || !problems.is_empty() {
            let err = EngineError::AggregationInvariant {
                expected,
                received: self.received,
                detail: problems.join("; "),
            };
            error!(%err, "refusing to build an incomplete report");
            return Err(err);
        }

        let mut nodes = Vec::with_capacity(self.nodes.len());
        for (node, host) in &self.nodes {
            let results: Vec<CollectionResult> = self
                .collectors
                .iter()
                .filter_map(|collector| self.results.remove(&(node.clone(), collector.clone())))
                .collect();
            nodes.push(NodeReport {
                node: node.clone(),
                host: host.clone(),
                success: results.iter().all(|result| result.success),
                results,
            });
        }

        let report = AggregateReport {
            started_at: self.started_at,
            finished_at: Utc::now(),
            nodes,
        };
        let summary = report.summary();
        info!(
            nodes_ok = summary.nodes_ok,
            nodes_failed = summary.nodes_failed,
            results_failed = summary.results_failed,
            timed_out = summary.timed_out,
            canceled = summary.canceled,
            "collection finished"
        );
        Ok(report)
    }

    fn pairs(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.nodes.iter().flat_map(move |(node, _)| {
            self.collectors
                .iter()
                .map(move |collector| (node.clone(), collector.clone()))
        })
    }
}

fn describe(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(node, collector)| format!("{collector}@{node}"))
        .collect::<Vec<_>>()
        .join(", ")
}
