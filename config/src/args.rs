use crate::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Collect performance and configuration metrics from a fleet of nodes.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version = version(), about, long_about = None)]
pub struct Args {
    /// Additional configuration file, layered on top of the one in the config directory.
    #[clap(long, value_name = "FILE", env = "CLUSTER_REPORT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Comma separated `host` or `host:port` list. Overrides `--cluster`.
    #[clap(long, value_name = "NODES", value_delimiter = ',')]
    pub nodes: Vec<String>,

    /// Name of a cluster from the configuration file.
    #[clap(long, value_name = "NAME")]
    pub cluster: Option<String>,

    /// Comma separated collector names (`hardware`, `performance`, `network` or a custom one), in
    /// the order they should appear in the report.
    #[clap(long, value_name = "NAMES", value_delimiter = ',')]
    pub collectors: Vec<String>,

    /// Maximum number of collections in flight.
    #[clap(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Per collection timeout, e.g. `30s` or `5m`.
    #[clap(long, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Deadline for the whole run. Unfinished collections are reported as canceled.
    #[clap(long, value_name = "DURATION")]
    pub overall_timeout: Option<String>,

    /// Number of retries after a failed (not timed out) collection.
    #[clap(long, value_name = "N")]
    pub retry: Option<u32>,

    /// Reuse a node's collected metrics for this long.
    #[clap(long, value_name = "DURATION")]
    pub cache_ttl: Option<String>,

    /// Report format.
    #[clap(long, short, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Write the report to this file instead of stdout.
    #[clap(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log at debug level.
    #[clap(long, short, action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if !self.nodes.is_empty() {
                cache.insert("nodes".to_string(), self.nodes.clone().into());
            }
            if let Some(cluster) = &self.cluster {
                cache.insert("cluster".to_string(), cluster.clone().into());
            }
            if !self.collectors.is_empty() {
                cache.insert("collector.enabled".to_string(), self.collectors.clone().into());
            }
            if let Some(parallel) = self.parallel {
                cache.insert("collector.parallel".to_string(), (parallel as u64).into());
            }
            if let Some(timeout) = &self.timeout {
                cache.insert("collector.timeout".to_string(), timeout.clone().into());
            }
            if let Some(overall_timeout) = &self.overall_timeout {
                cache.insert("collector.overall_timeout".to_string(), overall_timeout.clone().into());
            }
            if let Some(retry) = self.retry {
                cache.insert("collector.retry".to_string(), (retry as u64).into());
            }
            if let Some(cache_ttl) = &self.cache_ttl {
                cache.insert("collector.cache_ttl".to_string(), cache_ttl.clone().into());
            }
            if let Some(format) = self.format {
                cache.insert("output.format".to_string(), format.to_string().into());
            }
            if let Some(output) = &self.output {
                cache.insert("output.file".to_string(), output.display().to_string().into());
            }
            if self.verbose {
                cache.insert("verbose".to_string(), true.into());
            }
            Ok(cache)
        }
    }
}

pub fn version() -> String {
    let author = clap::crate_authors!();
    let config_dir_path = crate::get_config_dir().display().to_string();
    let data_dir_path = crate::get_data_dir().display().to_string();

    format!(
        "{}

Authors: {author}

Config directory: {config_dir_path}
Data directory: {data_dir_path}",
        clap::crate_version!()
    )
}
