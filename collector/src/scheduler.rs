use crate::{
    CollectError,
    CollectionResult,
    Collector,
    Deadline,
    EngineError,
    Metrics,
};
use chrono::{
    DateTime,
    Utc,
};
use cluster_report_config::Node;
use futures::FutureExt as _;
use std::{
    panic::AssertUnwindSafe,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{
        mpsc,
        Semaphore,
    },
    task::JoinSet,
};
use tokio_util::sync::CancellationToken;

/// One (node, collector) pair, owned by the worker executing it.
pub struct CollectionTask {
    pub node: Arc<Node>,
    pub collector: Arc<dyn Collector>,
    pub started_at: DateTime<Utc>,
}

impl CollectionTask {
    fn new(node: Arc<Node>, collector: Arc<dyn Collector>) -> Self {
        Self {
            node,
            collector,
            started_at: Utc::now(),
        }
    }

    fn finish(self, outcome: Result<Metrics, CollectError>) -> CollectionResult {
        CollectionResult::new(
            self.node.name.clone(),
            self.collector.name(),
            outcome,
            self.started_at,
            Utc::now(),
        )
    }
}

/// Bounded worker pool executing every (node, collector) pair of a run.
#[derive(Debug, Clone)]
pub struct Scheduler {
    parallelism: usize,
    task_timeout: Duration,
    retries: u32,
    retry_backoff: Duration,
}

impl Scheduler {
    pub fn new(parallelism: usize, task_timeout: Duration) -> Result<Self, EngineError> {
        if parallelism == 0 {
            return Err(EngineError::configuration("parallelism must be at least 1"));
        }
        if task_timeout.is_zero() {
            return Err(EngineError::configuration("task timeout must be greater than zero"));
        }
        Ok(Self {
            parallelism,
            task_timeout,
            retries: 0,
            retry_backoff: Duration::ZERO,
        })
    }

    /// Retries failed executions up to `retries` times, waiting `backoff * attempt` in between.
    /// Retries share the task's deadline.
    pub fn with_retries(mut self, retries: u32, backoff: Duration) -> Self {
        self.retries = retries;
        self.retry_backoff = backoff;
        self
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Starts executing the cross product of `nodes` and `collectors` and returns the stream of
    /// results. The stream yields exactly `nodes.len() * collectors.len()` results in completion
    /// order and closes once every task has reported.
    pub fn dispatch(
        &self,
        nodes: &[Arc<Node>],
        collectors: &[Arc<dyn Collector>],
        cancel: CancellationToken,
    ) -> mpsc::Receiver<CollectionResult> {
        let total = nodes.len() * collectors.len();
        let (tx, rx) = mpsc::channel(total.max(1));

        let pairs: Vec<(Arc<Node>, Arc<dyn Collector>)> = nodes
            .iter()
            .flat_map(|node| {
                collectors
                    .iter()
                    .map(move |collector| (node.clone(), collector.clone()))
            })
            .collect();

        let scheduler = self.clone();
        tokio::spawn(async move {
            let slots = Arc::new(Semaphore::new(scheduler.parallelism));
            let mut workers = JoinSet::new();

            for (node, collector) in pairs {
                let permit = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    permit = slots.clone().acquire_owned() => permit.ok(),
                };

                let task = CollectionTask::new(node, collector);
                let Some(permit) = permit else {
                    trace!(node = %task.node.name, collector = task.collector.name(), "skipping canceled task");
                    let _ = tx.send(task.finish(Err(CollectError::Canceled))).await;
                    continue;
                };

                let tx = tx.clone();
                let cancel = cancel.clone();
                let scheduler = scheduler.clone();
                workers.spawn(async move {
                    let result = scheduler.execute(task, cancel).await;
                    drop(permit);
                    if tx.send(result).await.is_err() {
                        warn!("result receiver dropped before the run finished");
                    }
                });
            }

            while let Some(joined) = workers.join_next().await {
                if let Err(err) = joined {
                    error!(?err, "collection worker died without reporting");
                }
            }
            debug!(total, "all collection tasks reported");
        });

        rx
    }

    #[instrument(level = "debug", skip_all, fields(node = %task.node.name, collector = task.collector.name()))]
    async fn execute(&self, task: CollectionTask, cancel: CancellationToken) -> CollectionResult {
        let deadline = Deadline::new(self.task_timeout, cancel);
        let mut attempt = 0;

        let outcome = loop {
            let call = AssertUnwindSafe(task.collector.collect(&task.node, &deadline))
                .catch_unwind()
                .map(|result| {
                    result.unwrap_or_else(|panic| Err(CollectError::execution(panic_message(panic.as_ref()))))
                });

            match deadline.run(call).await {
                Err(err) if err.is_retryable() && attempt < self.retries => {
                    attempt += 1;
                    debug!(%err, attempt, "collection failed, retrying");
                    let backoff = self.retry_backoff * attempt;
                    let waited = deadline
                        .run(async {
                            tokio::time::sleep(backoff).await;
                            Ok(())
                        })
                        .await;
                    if let Err(err) = waited {
                        break Err(err);
                    }
                }
                outcome => break outcome,
            }
        };

        match &outcome {
            Ok(_) => debug!("collection succeeded"),
            Err(err) => info!(%err, "collection failed"),
        }
        task.finish(outcome)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("collector panicked: {detail}")
}
