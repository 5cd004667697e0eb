//! Test doubles shared by the unit tests of this crate.

use crate::{
    CollectError,
    CollectFuture,
    Collector,
    DataKind,
    Deadline,
    ExecFuture,
    Metrics,
    Transport,
};
use cluster_report_config::Node;
use serde_json::json;
use std::{
    collections::HashMap,
    sync::{
        atomic::{
            AtomicUsize,
            Ordering,
        },
        Arc,
        Mutex,
    },
    time::Duration,
};

/// Answers commands from a fixed table, failing on anything it does not know.
pub(crate) struct ScriptedTransport {
    outputs: HashMap<String, String>,
}

impl ScriptedTransport {
    pub(crate) fn new<const N: usize>(outputs: [(&str, &str); N]) -> Self {
        Self {
            outputs: outputs
                .into_iter()
                .map(|(command, output)| (command.to_string(), output.to_string()))
                .collect(),
        }
    }
}

impl Transport for ScriptedTransport {
    fn execute<'a>(&'a self, node: &'a Node, command: &'a str) -> ExecFuture<'a> {
        Box::pin(async move {
            self.outputs
                .get(command)
                .map(|output| output.as_bytes().to_vec())
                .ok_or_else(|| CollectError::execution(format!("no scripted output for `{command}` on {}", node.name)))
        })
    }
}

/// What a [`MockCollector`] does for a given node.
#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    /// Sleep, then succeed.
    Succeed(Duration),
    /// Sleep, then fail with an execution error.
    Fail(Duration),
    /// Never finish on its own.
    Hang,
    Panic,
}

/// Collector with per-node scripted behavior that records call and concurrency statistics.
pub(crate) struct MockCollector {
    name: String,
    default: Behavior,
    overrides: HashMap<String, Behavior>,
    /// Failures to emit per node before falling back to the scripted behavior.
    flaky: Mutex<HashMap<String, usize>>,
    pub(crate) stats: Arc<Stats>,
}

#[derive(Debug, Default)]
pub(crate) struct Stats {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Stats {
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

struct InFlight<'a>(&'a Stats);

impl<'a> InFlight<'a> {
    fn enter(stats: &'a Stats) -> Self {
        stats.calls.fetch_add(1, Ordering::SeqCst);
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockCollector {
    pub(crate) fn new(name: &str, default: Behavior) -> Self {
        Self {
            name: name.to_string(),
            default,
            overrides: HashMap::new(),
            flaky: Mutex::new(HashMap::new()),
            stats: Arc::new(Stats::default()),
        }
    }

    pub(crate) fn with_node(mut self, node: &str, behavior: Behavior) -> Self {
        self.overrides.insert(node.to_string(), behavior);
        self
    }

    pub(crate) fn failing_first(self, node: &str, failures: usize) -> Self {
        self.flaky
            .lock()
            .expect("flaky lock poisoned")
            .insert(node.to_string(), failures);
        self
    }

    pub(crate) fn shared(self) -> Arc<dyn Collector> {
        Arc::new(self)
    }

    fn take_flaky_failure(&self, node: &str) -> bool {
        let mut flaky = self.flaky.lock().expect("flaky lock poisoned");
        match flaky.get_mut(node) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }
}

impl Collector for MockCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn kinds(&self) -> &[DataKind] {
        &[DataKind::Custom]
    }

    fn collect<'a>(&'a self, node: &'a Node, _deadline: &'a Deadline) -> CollectFuture<'a> {
        Box::pin(async move {
            let _guard = InFlight::enter(&self.stats);
            if self.take_flaky_failure(&node.name) {
                return Err(CollectError::execution("connection reset"));
            }
            let behavior = self.overrides.get(&node.name).unwrap_or(&self.default).clone();
            match behavior {
                Behavior::Succeed(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(metrics_for(&self.name, &node.name))
                }
                Behavior::Fail(delay) => {
                    tokio::time::sleep(delay).await;
                    Err(CollectError::execution(format!("{} unreachable", node.host)))
                }
                Behavior::Hang => std::future::pending().await,
                Behavior::Panic => panic!("collector {} exploded", self.name),
            }
        })
    }
}

pub(crate) fn metrics_for(collector: &str, node: &str) -> Metrics {
    Metrics::from_iter([("source".to_string(), json!(format!("{collector}@{node}")))])
}

pub(crate) fn nodes(names: &[&str]) -> Vec<Node> {
    names.iter().map(|name| Node::new(*name, format!("{name}.internal"))).collect()
}
