use crate::{
    CollectError,
    Deadline,
};
use cluster_report_config::Node;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    future::Future,
    pin::Pin,
};

/// Collected values, keyed by metric name. The engine routes them without looking inside.
pub type Metrics = serde_json::Map<String, serde_json::Value>;

pub type CollectFuture<'a> = Pin<Box<dyn Future<Output = Result<Metrics, CollectError>> + Send + 'a>>;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DataKind {
    Hardware,
    Performance,
    Network,
    Storage,
    Custom,
}

/// Trait for collecting one kind of metrics payload from a node.
///
/// One instance is shared by every worker of a run, so implementations must not keep
/// per-node state between calls.
pub trait Collector: Send + Sync {
    /// Name used for lookup and as the report key. Unique within a run.
    fn name(&self) -> &str;

    /// The data kinds this collector produces.
    fn kinds(&self) -> &[DataKind];

    /// Collect metrics from `node`, giving up once `deadline` passes or the run is canceled.
    fn collect<'a>(&'a self, node: &'a Node, deadline: &'a Deadline) -> CollectFuture<'a>;
}
