//! Layered configuration: optional TOML file, then `ROUTEWATCH__*` environment overrides

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::collectors::traps::DEFAULT_TRAP_PORT;
use crate::models::DeviceDescriptor;
use crate::snmp::{RetryPolicy, SessionOptions, Version};

pub const DEFAULT_CONFIG_FILE: &str = "routewatch.toml";
pub const ENV_PREFIX: &str = "ROUTEWATCH";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub snmp: SnmpConfig,
    pub listener: ListenerConfig,
    pub storage: StorageConfig,
    pub topology: TopologyConfig,
    pub devices: Vec<DeviceDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnmpConfig {
    pub version: Version,
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
}

impl Default for SnmpConfig {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            timeout_ms: 2_000,
            retry: RetryPolicy::none(),
        }
    }
}

impl SnmpConfig {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            version: self.version,
            timeout: Duration::from_millis(self.timeout_ms),
            retry: self.retry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub enabled: bool,
    pub bind_address: IpAddr,
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_TRAP_PORT,
        }
    }
}

impl ListenerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Json,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    /// SQLite file, used by the `sqlite` backend
    pub database: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            data_dir: PathBuf::from("data"),
            database: PathBuf::from("data/routewatch.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Inventory key of the discovery seed; the first device when unset
    pub seed: Option<String>,
    pub interval_secs: u64,
    pub auto_refresh: bool,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            seed: None,
            interval_secs: 300,
            auto_refresh: false,
        }
    }
}

impl AppConfig {
    /// Loads `path` (required) or `routewatch.toml` (optional), then applies
    /// environment overrides such as `ROUTEWATCH__SNMP__TIMEOUT_MS=500`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }
}
