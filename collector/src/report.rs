use crate::{
    CollectError,
    Metrics,
};
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Outcome of collecting one collector's metrics from one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionResult {
    pub node: String,
    pub collector: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<CollectError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CollectionResult {
    pub fn new(
        node: impl Into<String>,
        collector: impl Into<String>,
        outcome: Result<Metrics, CollectError>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        let (success, metrics, error) = match outcome {
            Ok(metrics) => (true, Some(metrics), None),
            Err(error) => (false, None, Some(error)),
        };
        Self {
            node: node.into(),
            collector: collector.into(),
            success,
            metrics,
            error,
            started_at,
            finished_at,
        }
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.error, Some(CollectError::Timeout { .. }))
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self.error, Some(CollectError::Canceled))
    }
}

/// All results of one node, in collector declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub node: String,
    pub host: String,
    /// True only when every collector succeeded on this node.
    pub success: bool,
    pub results: Vec<CollectionResult>,
}

impl NodeReport {
    pub fn result(&self, collector: &str) -> Option<&CollectionResult> {
        self.results.iter().find(|result| result.collector == collector)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CollectionResult> {
        self.results.iter().filter(|result| !result.success)
    }
}

/// Everything a collection run produced, one entry per requested node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub nodes: Vec<NodeReport>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub nodes: usize,
    pub nodes_ok: usize,
    pub nodes_failed: usize,
    pub results: usize,
    pub results_ok: usize,
    pub results_failed: usize,
    pub timed_out: usize,
    pub canceled: usize,
}

impl AggregateReport {
    pub fn get(&self, node: &str) -> Option<&NodeReport> {
        self.nodes.iter().find(|report| report.node == node)
    }

    /// Every result of the run, node by node.
    pub fn results(&self) -> impl Iterator<Item = &CollectionResult> {
        self.nodes.iter().flat_map(|node| node.results.iter())
    }

    pub fn total_results(&self) -> usize {
        self.nodes.iter().map(|node| node.results.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.nodes.iter().all(|node| node.success)
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            nodes: self.nodes.len(),
            ..RunSummary::default()
        };
        for node in &self.nodes {
            if node.success {
                summary.nodes_ok += 1;
            } else {
                summary.nodes_failed += 1;
            }
        }
        for result in self.results() {
            summary.results += 1;
            if result.success {
                summary.results_ok += 1;
            } else {
                summary.results_failed += 1;
            }
            if result.is_timeout() {
                summary.timed_out += 1;
            }
            if result.is_canceled() {
                summary.canceled += 1;
            }
        }
        summary
    }

    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
