use crate::output;
use cluster_report_collector::{
    Orchestrator,
    Registry,
    RunOptions,
    ShellTransport,
    Transport,
};
use cluster_report_config::Config;
use color_eyre::Result;
use eyre::Context as _;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub struct App {
    config: Config,
}

impl App {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Runs one collection with the configured nodes and collectors and emits the report.
    ///
    /// Ctrl-C cancels whatever is still pending; the partial report is emitted all the same.
    #[instrument(level = "debug", skip_all)]
    pub async fn run(self) -> Result<()> {
        let config = self.config;
        let nodes = config.resolve_nodes()?;

        let transport: Arc<dyn Transport> = Arc::new(ShellTransport::new(config.ssh.connect_timeout));
        let registry = Registry::builtin(transport, &config.custom_collectors, config.collector.cache_ttl)?;
        let collectors = registry.select(&config.collector.enabled)?;
        let options = RunOptions::from(&config.collector);

        info!(
            nodes = nodes.len(),
            collectors = ?collectors.iter().map(|c| c.name()).collect::<Vec<_>>(),
            "collecting"
        );

        let cancel = CancellationToken::new();
        let interrupt = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = cancel.cancelled() => {}
                    signal = tokio::signal::ctrl_c() => match signal {
                        Ok(()) => {
                            warn!("interrupted, canceling pending collections");
                            cancel.cancel();
                        }
                        Err(err) => error!(%err, "failed to listen for ctrl-c"),
                    },
                }
            })
        };

        let outcome = Orchestrator::new(options).run(&nodes, &collectors, cancel.clone()).await;
        cancel.cancel();
        let _ = interrupt.await;
        let report = outcome.wrap_err("Collection run failed")?;

        let summary = report.summary();
        if summary.nodes_failed > 0 {
            warn!(
                failed = summary.nodes_failed,
                total = summary.nodes,
                "some nodes did not report every collector"
            );
        }
        output::emit(&report, &config.output).await
    }
}
