use crate::{
    parse,
    CollectError,
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

/// Collects static host configuration: identity, kernel, CPU, memory and filesystems.
pub struct HardwareProbe {
    transport: Arc<dyn Transport>,
}

impl HardwareProbe {
    pub const NAME: &'static str = "hardware";

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    async fn run(&self, node: &Node, deadline: &Deadline, command: &str) -> Result<String, CollectError> {
        let output = deadline.run(self.transport.execute(node, command)).await?;
        Ok(String::from_utf8_lossy(&output).trim().to_string())
    }
}

impl Collector for HardwareProbe {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kinds(&self) -> &[DataKind] {
        &[DataKind::Hardware, DataKind::Storage]
    }

    fn collect<'a>(&'a self, node: &'a Node, deadline: &'a Deadline) -> CollectFuture<'a> {
        Box::pin(async move {
            let hostname = self.run(node, deadline, "hostname").await?;
            let kernel = self.run(node, deadline, "uname -r").await?;
            let cores = self.run(node, deadline, "nproc").await?;
            let cores: u32 = cores
                .parse()
                .map_err(|e| CollectError::execution(format!("unparseable `nproc` output {cores:?}: {e}")))?;
            let meminfo = self.run(node, deadline, "cat /proc/meminfo").await?;
            let disks = self.run(node, deadline, "df -P -k").await?;

            let mut metrics = Metrics::new();
            metrics.insert("hostname".to_string(), json!(hostname));
            metrics.insert("kernel".to_string(), json!(kernel));
            metrics.insert("cpu_cores".to_string(), json!(cores));
            metrics.insert("memory_total_kb".to_string(), json!(parse::mem_total_kb(&meminfo)));
            metrics.insert("filesystems".to_string(), json!(parse::filesystems(&disks)));
            Ok(metrics)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use pretty_assertions::assert_eq;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn collects_host_configuration() {
        let transport = ScriptedTransport::new([
            ("hostname", "web-1\n"),
            ("uname -r", "6.8.0-45-generic\n"),
            ("nproc", "8\n"),
            ("cat /proc/meminfo", "MemTotal:       16314220 kB\n"),
            (
                "df -P -k",
                "Filesystem 1024-blocks Used Available Capacity Mounted on\n/dev/sda1 1000 250 750 25% /\n",
            ),
        ]);
        let hardware = HardwareProbe::new(Arc::new(transport));
        let deadline = Deadline::new(Duration::from_secs(5), CancellationToken::new());

        let metrics = hardware.collect(&Node::new("web-1", "10.0.0.1"), &deadline).await.unwrap();
        assert_eq!(metrics["hostname"], json!("web-1"));
        assert_eq!(metrics["kernel"], json!("6.8.0-45-generic"));
        assert_eq!(metrics["cpu_cores"], json!(8));
        assert_eq!(metrics["memory_total_kb"], json!(16314220));
        assert_eq!(metrics["filesystems"][0]["mount_point"], json!("/"));
    }

    #[tokio::test]
    async fn failing_command_fails_the_collection() {
        let transport = ScriptedTransport::new([("hostname", "web-1\n")]);
        let hardware = HardwareProbe::new(Arc::new(transport));
        let deadline = Deadline::new(Duration::from_secs(5), CancellationToken::new());

        let err = hardware.collect(&Node::new("web-1", "10.0.0.1"), &deadline).await.unwrap_err();
        assert!(err.to_string().contains("uname -r"), "{err}");
    }
}
