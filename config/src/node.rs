use serde::{
    Deserialize,
    Serialize,
};
use std::{
    collections::BTreeMap,
    fmt,
    path::PathBuf,
};

const LOCAL_HOSTS: [&str; 3] = ["localhost", "127.0.0.1", "::1"];

/// Login material handed to the transport. The collection engine never looks inside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key: Option<PathBuf>,
}

/// A host metrics are collected from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing)]
    pub credentials: Credentials,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl Node {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: None,
            credentials: Credentials::default(),
            tags: BTreeMap::new(),
        }
    }

    /// Parses a `host` or `host:port` address. The node is named after the full address.
    pub fn from_address(address: &str) -> Result<Self, String> {
        let address = address.trim();
        if address.is_empty() {
            return Err("node address must not be empty".to_string());
        }

        // Bare IPv6 addresses contain colons but no port.
        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                let port = port
                    .parse::<u16>()
                    .map_err(|e| format!("invalid port in node address {address:?}: {e}"))?;
                (host, Some(port))
            }
            _ => (address, None),
        };

        if host.is_empty() {
            return Err(format!("node address {address:?} has no host"));
        }

        Ok(Self {
            port,
            ..Self::new(address, host)
        })
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Local nodes are collected from without going through SSH.
    pub fn is_local(&self) -> bool {
        LOCAL_HOSTS.contains(&self.host.as_str())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{} ({}:{})", self.name, self.host, port),
            None => write!(f, "{} ({})", self.name, self.host),
        }
    }
}
