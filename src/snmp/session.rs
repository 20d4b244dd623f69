//! The per-agent request seam
//!
//! [`AgentSession`] talks to a real agent through an `async_snmp` client,
//! connected on first use. Tests substitute in-process agents through the
//! same trait.

use async_snmp::{Auth, Client, Oid, Retry, UdpClient, VarBind};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;

use super::errors::{Result, SnmpError};

/// Community-based protocol version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    V1,
    #[default]
    V2c,
}

/// One agent, one binding per request
#[async_trait]
pub trait SnmpSession: Send + Sync {
    async fn get(&self, oid: &Oid) -> Result<VarBind>;

    async fn get_next(&self, oid: &Oid) -> Result<VarBind>;

    /// Human readable peer, for log lines and errors
    fn target(&self) -> String;
}

pub struct AgentSession {
    target: String,
    community: String,
    version: Version,
    timeout: Duration,
    client: OnceCell<UdpClient>,
}

impl std::fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSession")
            .field("target", &self.target)
            .field("version", &self.version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// `host:port`, bracketing IPv6 literals
fn target_address(host: &str, port: u16) -> String {
    if host.contains(':') && !host.starts_with('[') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

impl AgentSession {
    pub fn new(
        host: &str,
        port: u16,
        community: impl Into<String>,
        version: Version,
        timeout: Duration,
    ) -> Self {
        Self {
            target: target_address(host, port),
            community: community.into(),
            version,
            timeout,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&UdpClient> {
        self.client
            .get_or_try_init(|| async {
                let auth = match self.version {
                    Version::V1 => Auth::v1(self.community.clone()),
                    Version::V2c => Auth::v2c(self.community.clone()),
                };
                debug!("Opening SNMP session (target={}, version={:?})", self.target, self.version);
                // Retries are applied one level up, by SnmpClient
                Client::builder(self.target.clone(), auth)
                    .timeout(self.timeout)
                    .retry(Retry::none())
                    .connect()
                    .await
                    .map_err(|source| SnmpError::Connect {
                        target: self.target.clone(),
                        source,
                    })
            })
            .await
    }

    fn request_error(&self, source: async_snmp::Error) -> SnmpError {
        SnmpError::Request {
            target: self.target.clone(),
            source,
        }
    }
}

#[async_trait]
impl SnmpSession for AgentSession {
    async fn get(&self, oid: &Oid) -> Result<VarBind> {
        let client = self.client().await?;
        client.get(oid).await.map_err(|e| self.request_error(e))
    }

    async fn get_next(&self, oid: &Oid) -> Result<VarBind> {
        let client = self.client().await?;
        client.get_next(oid).await.map_err(|e| self.request_error(e))
    }

    fn target(&self) -> String {
        self.target.clone()
    }
}
