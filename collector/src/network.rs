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
use serde_json::{
    json,
    Value,
};
use std::sync::Arc;

/// Interface traffic counters from `/proc/net/dev`.
pub struct NetworkStats {
    transport: Arc<dyn Transport>,
}

impl NetworkStats {
    pub const NAME: &'static str = "network";

    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }
}

impl Collector for NetworkStats {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn kinds(&self) -> &[DataKind] {
        &[DataKind::Network]
    }

    fn collect<'a>(&'a self, node: &'a Node, deadline: &'a Deadline) -> CollectFuture<'a> {
        Box::pin(async move {
            let output = deadline.run(self.transport.execute(node, "cat /proc/net/dev")).await?;
            let interfaces = parse::interfaces(&String::from_utf8_lossy(&output));

            let total = |key: &str| -> u64 {
                interfaces
                    .iter()
                    .filter(|iface| iface["interface"] != "lo")
                    .filter_map(|iface| iface[key].as_u64())
                    .sum()
            };

            let mut metrics = Metrics::new();
            metrics.insert("rx_bytes".to_string(), json!(total("rx_bytes")));
            metrics.insert("tx_bytes".to_string(), json!(total("tx_bytes")));
            metrics.insert(
                "errors".to_string(),
                json!(total("rx_errors") + total("tx_errors")),
            );
            metrics.insert("interfaces".to_string(), Value::Array(interfaces));
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

    const NET_DEV: &str = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo:    5000      50    0    0    0     0          0         0     5000      50    0    0    0     0       0          0
  eth0:    1000      10    1    0    0     0          0         0     2000      20    0    0    0     0       0          0
  eth1:     300       3    0    0    0     0          0         0      400       4    2    0    0     0       0          0
";

    #[tokio::test]
    async fn sums_traffic_without_loopback() {
        let transport = ScriptedTransport::new([("cat /proc/net/dev", NET_DEV)]);
        let collector = NetworkStats::new(Arc::new(transport));
        let deadline = Deadline::new(Duration::from_secs(5), CancellationToken::new());

        let metrics = collector.collect(&Node::new("n1", "10.0.0.1"), &deadline).await.unwrap();
        assert_eq!(metrics["rx_bytes"], json!(1300));
        assert_eq!(metrics["tx_bytes"], json!(2400));
        assert_eq!(metrics["errors"], json!(3));
        assert_eq!(metrics["interfaces"].as_array().map(Vec::len), Some(3));
        assert_eq!(collector.kinds(), &[DataKind::Network]);
    }
}
