use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    path::PathBuf,
    time::Duration,
};

/// Worker pool and timing settings for a collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectorSettings {
    #[serde(default = "default_parallel")]
    pub parallel: usize,
    #[serde(default = "default_timeout", with = "humantime_duration")]
    pub timeout: Duration,
    #[serde(default, with = "humantime_duration_option")]
    pub overall_timeout: Option<Duration>,
    #[serde(default)]
    pub retry: u32,
    #[serde(default, with = "humantime_duration_option")]
    pub cache_ttl: Option<Duration>,
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            timeout: default_timeout(),
            overall_timeout: None,
            retry: 0,
            cache_ttl: None,
            enabled: default_enabled(),
        }
    }
}

fn default_parallel() -> usize {
    10
}

fn default_timeout() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_enabled() -> Vec<String> {
    vec!["hardware".to_string(), "performance".to_string()]
}

/// Fallbacks applied to nodes that do not set their own login details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshSettings {
    #[serde(default)]
    pub default_user: Option<String>,
    #[serde(default)]
    pub default_port: Option<u16>,
    #[serde(default)]
    pub default_key: Option<PathBuf>,
    #[serde(default = "default_connect_timeout", with = "humantime_duration")]
    pub connect_timeout: Duration,
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub name: String,
    pub nodes: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub ssh_key: Option<PathBuf>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParserKind {
    /// JSON when the output parses as an object, raw text otherwise.
    #[default]
    Auto,
    Json,
    KeyValue,
    Raw,
}

/// A user defined collector that runs a shell command on every node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCollectorConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub parser: ParserKind,
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

pub(crate) mod humantime_duration {
    use serde::{
        Deserialize,
        Deserializer,
        Serializer,
    };
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        humantime::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod humantime_duration_option {
    use serde::{
        Deserialize,
        Deserializer,
        Serializer,
    };
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match duration {
            Some(duration) => serializer.serialize_str(&humantime::format_duration(*duration).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) if !text.trim().is_empty() => humantime::parse_duration(&text)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
