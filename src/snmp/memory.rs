//! In-process agents for exercising the query layer without a network
//!
//! A [`MemoryAgent`] answers GET and GETNEXT from an ordered oid table, and a
//! [`MemoryNetwork`] maps device addresses to agents so discovery and
//! monitoring can run against a scripted fleet.

use async_snmp::{Oid, Value, VarBind};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::client::{Connector, RetryPolicy, SnmpClient};
use super::errors::{Result, SnmpError};
use super::session::SnmpSession;
use crate::models::DeviceDescriptor;

/// Rows keyed by arc sequence, so iteration follows lexicographic oid order
type Table = BTreeMap<Vec<u32>, (Oid, Value)>;

#[derive(Debug, Default)]
pub struct MemoryAgent {
    name: String,
    table: Mutex<Table>,
    requests: AtomicUsize,
}

impl MemoryAgent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(self, oid: Oid, value: Value) -> Self {
        self.set(oid, value);
        self
    }

    pub fn set(&self, oid: Oid, value: Value) {
        self.table().insert(oid.arcs().to_vec(), (oid, value));
    }

    pub fn remove(&self, oid: &Oid) -> Option<Value> {
        self.table().remove(oid.arcs()).map(|(_, value)| value)
    }

    /// Number of requests answered so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }

    fn table(&self) -> MutexGuard<'_, Table> {
        // A poisoned table still holds consistent entries
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl SnmpSession for MemoryAgent {
    async fn get(&self, oid: &Oid) -> Result<VarBind> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let value = match self.table().get(oid.arcs()) {
            Some((_, value)) => value.clone(),
            None => Value::NoSuchInstance,
        };
        Ok(VarBind::new(oid.clone(), value))
    }

    async fn get_next(&self, oid: &Oid) -> Result<VarBind> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let table = self.table();
        let next = table
            .range::<[u32], _>((Bound::Excluded(oid.arcs()), Bound::Unbounded))
            .next();
        Ok(match next {
            Some((_, (next_oid, value))) => VarBind::new(next_oid.clone(), value.clone()),
            None => VarBind::new(oid.clone(), Value::EndOfMibView),
        })
    }

    fn target(&self) -> String {
        format!("memory:{}", self.name)
    }
}

/// Session for an address nobody answers on
#[derive(Debug)]
struct Unreachable {
    address: String,
}

impl Unreachable {
    fn timeout(&self) -> SnmpError {
        SnmpError::Timeout {
            target: self.target(),
            timeout: Duration::ZERO,
        }
    }
}

#[async_trait]
impl SnmpSession for Unreachable {
    async fn get(&self, _oid: &Oid) -> Result<VarBind> {
        Err(self.timeout())
    }

    async fn get_next(&self, _oid: &Oid) -> Result<VarBind> {
        Err(self.timeout())
    }

    fn target(&self) -> String {
        format!("memory:{}", self.address)
    }
}

/// Address-to-agent map acting as a [`Connector`]
#[derive(Debug, Default, Clone)]
pub struct MemoryNetwork {
    agents: Arc<Mutex<HashMap<String, Arc<MemoryAgent>>>>,
    retry: RetryPolicy,
}

impl MemoryNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, address: impl Into<String>, agent: MemoryAgent) -> Arc<MemoryAgent> {
        let agent = Arc::new(agent);
        self.agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(address.into(), agent.clone());
        agent
    }

    /// Takes an address off the network; later connections time out
    pub fn remove(&self, address: &str) -> Option<Arc<MemoryAgent>> {
        self.agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(address)
    }

    pub fn agent(&self, address: &str) -> Option<Arc<MemoryAgent>> {
        self.agents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(address)
            .cloned()
    }
}

impl Connector for MemoryNetwork {
    fn connect(&self, device: &DeviceDescriptor) -> SnmpClient {
        let session: Arc<dyn SnmpSession> = match self.agent(&device.address) {
            Some(agent) => agent,
            None => Arc::new(Unreachable {
                address: device.address.clone(),
            }),
        };
        SnmpClient::new(session).with_retry(self.retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_snmp::oid;

    #[tokio::test]
    async fn test_get_next_walks_in_order() {
        let agent = MemoryAgent::new("R1")
            .with(oid!(1, 3, 6, 1, 2), Value::Integer(2))
            .with(oid!(1, 3, 6, 1, 1), Value::Integer(1))
            .with(oid!(1, 3, 6, 1, 10), Value::Integer(10));

        let first = agent.get_next(&oid!(1, 3, 6)).await.unwrap();
        assert_eq!(first.oid, oid!(1, 3, 6, 1, 1));

        // Arc order, not text order: .2 comes before .10
        let second = agent.get_next(&first.oid).await.unwrap();
        assert_eq!(second.oid, oid!(1, 3, 6, 1, 2));

        let end = agent.get_next(&oid!(1, 3, 6, 1, 10)).await.unwrap();
        assert_eq!(end.value, Value::EndOfMibView);
        assert_eq!(agent.request_count(), 3);
    }

    #[tokio::test]
    async fn test_get_missing_is_no_such_instance() {
        let agent = MemoryAgent::new("R1");
        let answer = agent.get(&oid!(1, 3, 6, 1, 2, 1, 1, 5, 0)).await.unwrap();
        assert_eq!(answer.value, Value::NoSuchInstance);
    }

    #[tokio::test]
    async fn test_network_unknown_address_times_out() {
        let network = MemoryNetwork::new();
        network.add("10.0.0.1", MemoryAgent::new("R1"));

        let reachable = network.connect(&DeviceDescriptor::new("10.0.0.1", "R1"));
        assert!(reachable.try_walk(&oid!(1, 3, 6, 1)).await.is_ok());

        let missing = network.connect(&DeviceDescriptor::new("10.0.0.9", "R9"));
        assert!(missing.try_walk(&oid!(1, 3, 6, 1)).await.is_err());
    }
}
