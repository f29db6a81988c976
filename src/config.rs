use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consensus::peers::{NodeId, Peers};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("config lists no nodes")]
    NoNodes,
    #[error("relay delay window is inverted: min {min_ms}ms > max {max_ms}ms")]
    DelayWindow { min_ms: u64, max_ms: u64 },
    #[error("{0} is not a valid server ID")]
    UnknownNode(String),
    #[error("invalid address {0}")]
    Address(String),
}

/// Static node table and relay settings, shared by every process of a deployment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    pub nodes: BTreeMap<NodeId, u16>,
    pub network: NetworkConfig,
    #[serde(default = "default_initial_balance")]
    pub initial_balance: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_initial_balance() -> i64 {
    100
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_min_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    3_000
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(ConfigError::NoNodes);
        }
        if self.network.min_delay_ms > self.network.max_delay_ms {
            return Err(ConfigError::DelayWindow {
                min_ms: self.network.min_delay_ms,
                max_ms: self.network.max_delay_ms,
            });
        }
        Ok(())
    }

    pub fn peers(&self) -> Peers {
        Peers::new(self.nodes.keys().cloned().collect())
    }

    pub fn node_addr(&self, id: &str) -> Result<SocketAddr, ConfigError> {
        let port = self
            .nodes
            .get(id)
            .ok_or_else(|| ConfigError::UnknownNode(id.to_string()))?;
        self.addr(*port)
    }

    pub fn relay_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.addr(self.network.port)
    }

    fn addr(&self, port: u16) -> Result<SocketAddr, ConfigError> {
        let text = format!("{}:{}", self.network.host, port);
        text.parse().map_err(|_| ConfigError::Address(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "nodes": {"1": 9001, "2": 9002, "3": 9003},
        "network": {"port": 9000}
    }"#;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config = Config::from_json(SAMPLE).unwrap();

        assert_eq!(config.initial_balance, 100);
        assert_eq!(config.network.host, "127.0.0.1");
        assert_eq!(config.network.min_delay_ms, 1_000);
        assert_eq!(config.network.max_delay_ms, 3_000);
        assert_eq!(config.peers().members, vec!["1", "2", "3"]);
    }

    #[test]
    fn test_addresses() {
        let config = Config::from_json(SAMPLE).unwrap();

        assert_eq!(config.node_addr("2").unwrap(), "127.0.0.1:9002".parse().unwrap());
        assert_eq!(config.relay_addr().unwrap(), "127.0.0.1:9000".parse().unwrap());
        assert!(matches!(config.node_addr("9"), Err(ConfigError::UnknownNode(id)) if id == "9"));
    }

    #[test]
    fn test_rejects_bad_configs() {
        assert!(matches!(
            Config::from_json(r#"{"nodes": {}, "network": {"port": 1}}"#),
            Err(ConfigError::NoNodes)
        ));
        assert!(matches!(
            Config::from_json(
                r#"{"nodes": {"1": 2}, "network": {"port": 1, "min_delay_ms": 5, "max_delay_ms": 1}}"#
            ),
            Err(ConfigError::DelayWindow { .. })
        ));
        assert!(matches!(Config::from_json("{"), Err(ConfigError::Parse(_))));
    }
}
