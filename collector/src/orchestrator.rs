use crate::{
    AggregateReport,
    Aggregator,
    Collector,
    EngineError,
    Scheduler,
};
use cluster_report_config::{
    CollectorSettings,
    Node,
};
use std::{
    collections::HashSet,
    sync::Arc,
    time::Duration,
};
use tokio_util::sync::CancellationToken;

/// Knobs of a single collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Upper bound on collections in flight at once.
    pub parallelism: usize,
    /// Budget of every (node, collector) pair, retries included.
    pub task_timeout: Duration,
    /// Cancels whatever is still pending once the whole run exceeds this.
    pub overall_timeout: Option<Duration>,
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            parallelism: 10,
            task_timeout: Duration::from_secs(5 * 60),
            overall_timeout: None,
            retries: 0,
            retry_backoff: Duration::from_millis(200),
        }
    }
}

impl From<&CollectorSettings> for RunOptions {
    fn from(settings: &CollectorSettings) -> Self {
        Self {
            parallelism: settings.parallel,
            task_timeout: settings.timeout,
            overall_timeout: settings.overall_timeout,
            retries: settings.retry,
            ..Self::default()
        }
    }
}

/// Runs every collector against every node and returns the assembled report.
pub struct Orchestrator {
    options: RunOptions,
}

impl Orchestrator {
    pub fn new(options: RunOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Collects from the cross product of `nodes` and `collectors`.
    ///
    /// Individual failures, timeouts and cancellations end up inside the report. An `Err` means
    /// the run was rejected up front or its results could not be accounted for.
    #[instrument(skip_all, fields(nodes = nodes.len(), collectors = collectors.len()))]
    pub async fn run(
        &self,
        nodes: &[Node],
        collectors: &[Arc<dyn Collector>],
        cancel: CancellationToken,
    ) -> Result<AggregateReport, EngineError> {
        validate(nodes, collectors)?;
        let scheduler = Scheduler::new(self.options.parallelism, self.options.task_timeout)?
            .with_retries(self.options.retries, self.options.retry_backoff);

        let run_token = cancel.child_token();
        // Dropping this future cancels whatever the dispatcher has not finished yet.
        let _abandoned = run_token.clone().drop_guard();
        let timer = self.options.overall_timeout.map(|limit| {
            let token = run_token.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        warn!(?limit, "overall timeout reached, canceling pending collections");
                        token.cancel();
                    }
                }
            })
        });

        info!(
            parallelism = self.options.parallelism,
            task_timeout = ?self.options.task_timeout,
            "starting collection"
        );
        let mut aggregator = Aggregator::new(nodes, collectors);
        let shared: Vec<Arc<Node>> = nodes.iter().cloned().map(Arc::new).collect();
        let results = scheduler.dispatch(&shared, collectors, run_token.clone());
        aggregator.consume(results).await;

        if let Some(timer) = timer {
            timer.abort();
        }
        aggregator.finish()
    }
}

/// Convenience wrapper around [`Orchestrator::run`] for callers without a cancellation source.
pub async fn run_collection(
    nodes: &[Node],
    collectors: &[Arc<dyn Collector>],
    options: &RunOptions,
) -> Result<AggregateReport, EngineError> {
    Orchestrator::new(options.clone())
        .run(nodes, collectors, CancellationToken::new())
        .await
}

fn validate(nodes: &[Node], collectors: &[Arc<dyn Collector>]) -> Result<(), EngineError> {
    if nodes.is_empty() {
        return Err(EngineError::configuration("no nodes to collect from"));
    }
    if collectors.is_empty() {
        return Err(EngineError::configuration("no collectors selected"));
    }

    let mut seen = HashSet::new();
    for node in nodes {
        if node.host.trim().is_empty() {
            return Err(EngineError::configuration(format!("node {:?} has no host", node.name)));
        }
        if !seen.insert(node.name.as_str()) {
            return Err(EngineError::configuration(format!("node {:?} is listed twice", node.name)));
        }
    }

    let mut seen = HashSet::new();
    for collector in collectors {
        if !seen.insert(collector.name()) {
            return Err(EngineError::configuration(format!(
                "collector {:?} is listed twice",
                collector.name()
            )));
        }
    }
    Ok(())
}
