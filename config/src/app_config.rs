use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{
    Path,
    PathBuf,
};

/// Directories resolved at startup and injected into the layered configuration.
#[derive(Clone, Debug, Deserialize, Default)]
pub(crate) struct AppConfig {
    #[serde(default)]
    pub(crate) data_dir: PathBuf,
    #[serde(default)]
    pub(crate) config_dir: PathBuf,
}

lazy_static::lazy_static! {
    /// `CLUSTER_REPORT_CONFIG`, the prefix of the directory override variables.
    pub(crate) static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase();
    static ref PROJECT_DIRS: Option<ProjectDirs> = ProjectDirs::from("io", "clusterreport", "cluster-report");
}

/// Where the log file goes. `CLUSTER_REPORT_CONFIG_DATA` overrides the platform default.
pub fn get_data_dir() -> PathBuf {
    resolve("DATA", ProjectDirs::data_local_dir, ".data")
}

/// Where `config.yaml` is looked up. `CLUSTER_REPORT_CONFIG_CONFIG` overrides the platform default.
pub fn get_config_dir() -> PathBuf {
    resolve("CONFIG", ProjectDirs::config_local_dir, ".config")
}

fn resolve(suffix: &str, platform: fn(&ProjectDirs) -> &Path, fallback: &str) -> PathBuf {
    if let Some(dir) = std::env::var_os(format!("{}_{suffix}", *PROJECT_NAME)) {
        return PathBuf::from(dir);
    }
    match PROJECT_DIRS.as_ref() {
        Some(dirs) => platform(dirs).to_path_buf(),
        None => PathBuf::from(".").join(fallback),
    }
}
