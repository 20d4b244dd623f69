//! Single-value and subtree queries against one agent

use async_snmp::{Oid, Value, VarBind};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use super::errors::{Result, SnmpError};
use super::mib;
use super::session::{AgentSession, SnmpSession, Version};
use super::values::ValueExt;
use crate::models::DeviceDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Get,
    GetNext,
}

/// Opt-in retry for transport failures. The default performs no retries:
/// every `get` and every `walk` step is exactly one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Base delay, doubled after each failed attempt
    #[serde(with = "millis")]
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(1u32 << attempt.min(16))
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Query client bound to one agent
#[derive(Clone)]
pub struct SnmpClient {
    session: Arc<dyn SnmpSession>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for SnmpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnmpClient")
            .field("target", &self.session.target())
            .field("retry", &self.retry)
            .finish()
    }
}

impl SnmpClient {
    pub fn new(session: Arc<dyn SnmpSession>) -> Self {
        Self {
            session,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn target(&self) -> String {
        self.session.target()
    }

    async fn request(&self, operation: Operation, oid: &Oid) -> Result<VarBind> {
        let mut attempt = 0;
        loop {
            let outcome = match operation {
                Operation::Get => self.session.get(oid).await,
                Operation::GetNext => self.session.get_next(oid).await,
            };
            match outcome {
                Ok(varbind) => return Ok(varbind),
                Err(e) if e.is_transport() && attempt < self.retry.max_retries => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        "{:?} {} on {} failed (attempt {}/{}) - retrying in {}ms: {}",
                        operation,
                        oid,
                        self.session.target(),
                        attempt + 1,
                        self.retry.max_retries + 1,
                        delay.as_millis(),
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Single-value query that distinguishes "unreachable" (`Err`) from
    /// "answered without a value" (`Ok(None)`)
    pub async fn try_get(&self, oid: &Oid) -> Result<Option<Value>> {
        match self.request(Operation::Get, oid).await {
            Ok(varbind) => Ok(Some(varbind.value).filter(|value| !value.is_absent())),
            Err(e) if e.is_transport() => Err(e),
            Err(e) => {
                debug!("GET {} on {} answered with an error: {}", oid, self.session.target(), e);
                Ok(None)
            }
        }
    }

    /// Single-value query; any failure reads as "value unavailable now"
    pub async fn get(&self, oid: &Oid) -> Option<Value> {
        match self.try_get(oid).await {
            Ok(value) => value,
            Err(e) => {
                debug!("GET {} on {} failed: {}", oid, self.session.target(), e);
                None
            }
        }
    }

    /// [`get`](Self::get) rendered as text
    pub async fn get_string(&self, oid: &Oid) -> Option<String> {
        self.get(oid).await.map(|value| value.pretty())
    }

    /// Subtree walk; a transport failure yields whatever was collected before it
    pub async fn walk(&self, base: &Oid) -> Vec<(Oid, Value)> {
        let (entries, error) = self.walk_collect(base).await;
        if let Some(e) = error {
            debug!(
                "Walk of {} on {} stopped after {} entries: {}",
                base,
                self.session.target(),
                entries.len(),
                e
            );
        }
        entries
    }

    /// Subtree walk that reports a transport failure instead of a partial result
    pub async fn try_walk(&self, base: &Oid) -> Result<Vec<(Oid, Value)>> {
        match self.walk_collect(base).await {
            (entries, None) => Ok(entries),
            (_, Some(e)) => Err(e),
        }
    }

    async fn walk_collect(&self, base: &Oid) -> (Vec<(Oid, Value)>, Option<SnmpError>) {
        let mut entries = Vec::new();
        let mut anchor = base.clone();

        loop {
            let varbind = match self.request(Operation::GetNext, &anchor).await {
                Ok(varbind) => varbind,
                Err(e) if e.is_transport() => return (entries, Some(e)),
                // v1 agents report the end of the MIB as noSuchName
                Err(e) => {
                    debug!("Walk of {} on {} ended by the agent: {}", base, self.session.target(), e);
                    return (entries, None);
                }
            };

            if varbind.value.is_absent() || !mib::within(&varbind.oid, base) {
                return (entries, None);
            }
            if varbind.oid.arcs() <= anchor.arcs() {
                warn!(
                    "Agent {} returned non-increasing oid {} after {} - ending walk of {}",
                    self.session.target(),
                    varbind.oid,
                    anchor,
                    base
                );
                return (entries, None);
            }
            anchor = varbind.oid.clone();
            entries.push((varbind.oid, varbind.value));
        }
    }
}

/// Builds clients for inventory devices and for neighbors met during discovery
pub trait Connector: Send + Sync {
    fn connect(&self, device: &DeviceDescriptor) -> SnmpClient;
}

/// Session options shared by every agent client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub version: Version,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            version: Version::V2c,
            timeout: Duration::from_secs(2),
            retry: RetryPolicy::none(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UdpConnector {
    options: SessionOptions,
}

impl UdpConnector {
    pub fn new(options: SessionOptions) -> Self {
        Self { options }
    }
}

impl Connector for UdpConnector {
    fn connect(&self, device: &DeviceDescriptor) -> SnmpClient {
        let session = AgentSession::new(
            &device.address,
            device.port,
            device.community.clone(),
            self.options.version,
            self.options.timeout,
        );
        SnmpClient::new(Arc::new(session)).with_retry(self.options.retry)
    }
}
