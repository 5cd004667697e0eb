#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod node;
mod settings;

use app_config::AppConfig;
pub use app_config::{
    get_config_dir,
    get_data_dir,
};
pub use args::Args;
use color_eyre::Result;
use eyre::{
    eyre,
    Context as _,
};
pub use node::{
    Credentials,
    Node,
};
use serde::{
    Deserialize,
    Serialize,
};
pub use settings::{
    ClusterConfig,
    CollectorSettings,
    CustomCollectorConfig,
    OutputFormat,
    OutputSettings,
    ParserKind,
    SshSettings,
};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    pub(crate) app_config: AppConfig,
    /// Ad-hoc node addresses. Takes precedence over `cluster` and `clusters`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
    /// Restricts the run to one entry of `clusters`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
    #[serde(default)]
    pub clusters: Vec<ClusterConfig>,
    #[serde(default)]
    pub collector: CollectorSettings,
    #[serde(default)]
    pub custom_collectors: Vec<CustomCollectorConfig>,
    #[serde(default)]
    pub ssh: SshSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub verbose: bool,
}

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");

impl Default for Config {
    fn default() -> Self {
        serde_yml::from_str(DEFAULT_CONFIG).expect("Failed to parse default config")
    }
}

impl Config {
    /// Layers the built-in defaults, `config.yaml` from the config directory, the file passed
    /// with `--config` and finally the command line.
    pub fn new(args: Args) -> Result<Self, config::ConfigError> {
        let data_dir = get_data_dir();
        let config_dir = get_config_dir();
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.display().to_string())?
            .set_default("config_dir", config_dir.display().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let config_files = [("config.yaml", config::FileFormat::Yaml)];

        for (file, format) in &config_files {
            let source = config::File::from(config_dir.join(file))
                .format(*format)
                .required(false);
            builder = builder.add_source(source);
        }

        if let Some(path) = &args.config {
            debug!(?path, "Adding configuration file from args");
            builder = builder.add_source(config::File::from(path.as_path()).format(config::FileFormat::Yaml));
        }

        builder = builder.add_source(args);

        let cfg: Self = builder.build()?.try_deserialize()?;

        Ok(cfg)
    }

    /// Reads a standalone configuration file without touching the config directory.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).wrap_err_with(|| format!("Failed to read config from {:?}", path))?;
        serde_yml::from_str(&content).wrap_err_with(|| format!("Failed to parse config from {:?}", path))
    }

    pub fn data_dir(&self) -> &Path {
        &self.app_config.data_dir
    }

    pub fn config_dir(&self) -> &Path {
        &self.app_config.config_dir
    }

    /// Resolves the nodes to collect from.
    ///
    /// Ad-hoc `nodes` win over a selected `cluster`; without either every configured cluster is
    /// used, and an empty configuration falls back to `localhost`.
    #[instrument(level = "debug", skip(self))]
    pub fn resolve_nodes(&self) -> Result<Vec<Node>> {
        if !self.nodes.is_empty() {
            return self
                .nodes
                .iter()
                .map(|address| self.node_from_address(address, None))
                .collect();
        }

        let clusters: Vec<&ClusterConfig> = match &self.cluster {
            Some(name) => {
                let cluster = self
                    .clusters
                    .iter()
                    .find(|cluster| &cluster.name == name)
                    .ok_or_else(|| eyre!("cluster {name:?} is not configured"))?;
                vec![cluster]
            }
            None => self.clusters.iter().collect(),
        };

        if clusters.is_empty() {
            info!("No nodes or clusters configured, collecting from localhost");
            return Ok(vec![Node::new("localhost", "localhost")]);
        }

        let mut nodes = Vec::new();
        for cluster in clusters {
            if cluster.nodes.is_empty() {
                warn!(cluster = %cluster.name, "Cluster has no nodes");
            }
            for address in &cluster.nodes {
                nodes.push(self.node_from_address(address, Some(cluster))?);
            }
        }
        Ok(nodes)
    }

    fn node_from_address(&self, address: &str, cluster: Option<&ClusterConfig>) -> Result<Node> {
        let mut node = Node::from_address(address).map_err(|e| eyre!(e))?;

        let port = cluster.and_then(|c| c.port).or(self.ssh.default_port);
        if node.port.is_none() {
            node.port = port;
        }

        node.credentials = Credentials {
            username: cluster
                .and_then(|c| c.username.clone())
                .or_else(|| self.ssh.default_user.clone()),
            ssh_key: cluster
                .and_then(|c| c.ssh_key.clone())
                .or_else(|| self.ssh.default_key.clone()),
        };

        if let Some(cluster) = cluster {
            node.tags.extend(cluster.tags.clone());
            node.tags.insert("cluster".to_string(), cluster.name.clone());
        }

        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::{
        path::PathBuf,
        time::Duration,
    };
    use temp_dir::TempDir;

    const CLUSTER_CONFIG: &str = r#"
collector:
  parallel: 4
  timeout: 30s
  overall_timeout: 2m
  enabled: [performance]
ssh:
  default_user: root
  default_port: 2200
clusters:
  - name: web
    nodes: [web-1, "web-2:22"]
    username: ops
    tags:
      tier: frontend
  - name: db
    nodes: [db-1]
    ssh_key: /keys/db
custom_collectors:
  - name: nginx
    command: nginx -v
    parser: raw
output:
  format: json
"#;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("cluster.yaml");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn default_config_parses() {
        let config = Config::default();
        assert_eq!(config.collector, CollectorSettings::default());
        assert_eq!(config.output.format, OutputFormat::Table);
        assert!(config.clusters.is_empty());
        assert_eq!(config.ssh.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn layers_file_and_args() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, CLUSTER_CONFIG);

        let args = Args {
            config: Some(path),
            parallel: Some(2),
            cache_ttl: Some("10s".to_string()),
            format: Some(OutputFormat::Yaml),
            ..Args::default()
        };
        let config = Config::new(args).unwrap();

        assert_eq!(config.collector.parallel, 2);
        assert_eq!(config.collector.timeout, Duration::from_secs(30));
        assert_eq!(config.collector.overall_timeout, Some(Duration::from_secs(120)));
        assert_eq!(config.collector.cache_ttl, Some(Duration::from_secs(10)));
        assert_eq!(config.collector.enabled, vec!["performance".to_string()]);
        assert_eq!(config.output.format, OutputFormat::Yaml);
        assert_eq!(config.custom_collectors.len(), 1);
        assert_eq!(config.custom_collectors[0].parser, ParserKind::Raw);
    }

    #[test]
    fn resolves_cluster_nodes_with_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::from_file(&write_config(&dir, CLUSTER_CONFIG)).unwrap();

        let nodes = config.resolve_nodes().unwrap();
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["web-1", "web-2:22", "db-1"]);

        assert_eq!(nodes[0].port, Some(2200));
        assert_eq!(nodes[0].credentials.username.as_deref(), Some("ops"));
        assert_eq!(nodes[0].tags.get("tier").map(String::as_str), Some("frontend"));
        assert_eq!(nodes[0].tags.get("cluster").map(String::as_str), Some("web"));
        assert_eq!(nodes[1].port, Some(22));
        assert_eq!(nodes[2].credentials.username.as_deref(), Some("root"));
        assert_eq!(nodes[2].credentials.ssh_key, Some(PathBuf::from("/keys/db")));
    }

    #[test]
    fn selects_cluster_and_ad_hoc_nodes() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::from_file(&write_config(&dir, CLUSTER_CONFIG)).unwrap();

        config.cluster = Some("db".to_string());
        let nodes = config.resolve_nodes().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].host, "db-1");

        config.nodes = vec!["10.0.0.5".to_string()];
        let nodes = config.resolve_nodes().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].host, "10.0.0.5");
        assert!(nodes[0].tags.is_empty());

        config.nodes.clear();
        config.cluster = Some("missing".to_string());
        assert!(config.resolve_nodes().is_err());
    }

    #[test]
    fn falls_back_to_localhost() {
        let nodes = Config::default().resolve_nodes().unwrap();
        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_local());
    }
}
