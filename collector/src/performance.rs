use crate::{
    parse,
    CollectFuture,
    Collector,
    DataKind,
    Deadline,
    Metrics,
    Transport,
};
use cluster_report_config::Node;
use serde_json::json;
use std::sync::Arc;

/// Point-in-time performance snapshot: load, memory pressure and uptime.
pub struct PerformanceSnapshot {
    transport: Arc<dyn Transport>,
}

impl PerformanceSnapshot {
    pub const NAME: &'static str = "performance";

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl Collector for PerformanceSnapshot {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kinds(&self) -> &[DataKind] {
        &[DataKind::Performance]
    }

    fn collect<'a>(&'a self, node: &'a Node, deadline: &'a Deadline) -> CollectFuture<'a> {
        Box::pin(async move {
            let loadavg = deadline.run(self.transport.execute(node, "cat /proc/loadavg")).await?;
            let free = deadline.run(self.transport.execute(node, "free -m")).await?;
            let uptime = deadline.run(self.transport.execute(node, "cat /proc/uptime")).await?;

            let mut metrics = Metrics::new();
            metrics.insert(
                "load_average".to_string(),
                parse::load_average(&String::from_utf8_lossy(&loadavg))?,
            );
            let memory = parse::free_megabytes(&String::from_utf8_lossy(&free))?;
            metrics.insert("memory".to_string(), memory["memory"].clone());
            metrics.insert("swap".to_string(), memory["swap"].clone());
            metrics.insert(
                "uptime_seconds".to_string(),
                json!(parse::uptime_seconds(&String::from_utf8_lossy(&uptime))?),
            );
            Ok(metrics)
        })
    }
}
