//! Bounded-duration counter polling, at most one session per (device, interface)

use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::device_info::DeviceInfoCollector;
use super::errors::MonitorError;
use crate::inventory::Inventory;
use crate::models::{MonitoringSession, Sample, SeriesKey};
use crate::snmp::{Connector, Oid, SnmpClient, ValueExt, mib};
use crate::storage::TelemetryStore;

pub type Result<T> = std::result::Result<T, MonitorError>;

enum Slot {
    /// Key held while the interface name is being resolved
    Reserved { generation: u64 },
    Active(ActiveSession),
}

impl Slot {
    fn generation(&self) -> u64 {
        match self {
            Slot::Reserved { generation } => *generation,
            Slot::Active(session) => session.generation,
        }
    }
}

struct ActiveSession {
    generation: u64,
    info: MonitoringSession,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    finished: watch::Receiver<bool>,
}

type Registry = Arc<Mutex<HashMap<SeriesKey, Slot>>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<SeriesKey, Slot>> {
    registry.lock().unwrap_or_else(|e| e.into_inner())
}

/// Removes `key` only if it still belongs to `generation`
fn release(registry: &Registry, key: &SeriesKey, generation: u64) -> bool {
    let mut sessions = lock(registry);
    if sessions.get(key).map(Slot::generation) == Some(generation) {
        sessions.remove(key);
        true
    } else {
        false
    }
}

/// A `Slot::Reserved` entry that is released on drop unless disarmed
struct Reservation {
    registry: Registry,
    key: SeriesKey,
    generation: u64,
    armed: bool,
}

impl Reservation {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.armed && release(&self.registry, &self.key, self.generation) {
            debug!("Released reservation (key={})", self.key);
        }
    }
}

pub struct MonitoringScheduler {
    inventory: Arc<Inventory>,
    connector: Arc<dyn Connector>,
    store: Arc<dyn TelemetryStore>,
    sessions: Registry,
    next_generation: AtomicU64,
}

impl MonitoringScheduler {
    pub fn new(
        inventory: Arc<Inventory>,
        connector: Arc<dyn Connector>,
        store: Arc<dyn TelemetryStore>,
    ) -> Self {
        Self {
            inventory,
            connector,
            store,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Series key with the device canonicalized to its inventory address
    fn series_key(&self, device: &str, interface: &str) -> Result<SeriesKey> {
        let descriptor = self
            .inventory
            .find(device)
            .ok_or_else(|| MonitorError::DeviceNotFound(device.to_string()))?;
        Ok(SeriesKey::new(&descriptor.address, interface))
    }

    /// Starts polling ifInOctets of `interface` every `interval_secs` for `duration_secs`
    pub async fn start(
        &self,
        device: &str,
        interface: &str,
        interval_secs: u64,
        duration_secs: u64,
    ) -> Result<MonitoringSession> {
        if interval_secs == 0 {
            return Err(MonitorError::InvalidInterval);
        }
        let descriptor = self
            .inventory
            .find(device)
            .cloned()
            .ok_or_else(|| MonitorError::DeviceNotFound(device.to_string()))?;
        let key = SeriesKey::new(&descriptor.address, interface);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let reservation = {
            let mut sessions = lock(&self.sessions);
            if sessions.contains_key(&key) {
                return Err(MonitorError::AlreadyActive(key));
            }
            sessions.insert(key.clone(), Slot::Reserved { generation });
            Reservation {
                registry: self.sessions.clone(),
                key: key.clone(),
                generation,
                armed: true,
            }
        };

        // Dropping this future here releases the reservation
        let client = self.connector.connect(&descriptor);
        let index = DeviceInfoCollector::new(client.clone())
            .resolve_interface_index(interface)
            .await;
        let Some(index) = index else {
            drop(reservation);
            return Err(MonitorError::InterfaceNotFound {
                device: descriptor.address,
                interface: interface.to_string(),
            });
        };

        let info = MonitoringSession {
            device: key.device.clone(),
            interface: key.interface.clone(),
            interval_secs,
            duration_secs,
            started_at: Utc::now(),
        };
        let cancel = CancellationToken::new();
        let poller = Poller {
            client,
            key: key.clone(),
            counter: mib::instance(mib::IF_IN_OCTETS, index),
            interval: Duration::from_secs(interval_secs),
            duration: Duration::from_secs(duration_secs),
            store: self.store.clone(),
        };

        // Held across spawn so the loop cannot deregister before it is registered
        let mut sessions = lock(&self.sessions);
        let registry = self.sessions.clone();
        let task_cancel = cancel.clone();
        let task_key = key.clone();
        let (finished_tx, finished) = watch::channel(false);
        let handle = tokio::spawn(async move {
            poller.run(task_cancel).await;
            if release(&registry, &task_key, generation) {
                info!("Monitoring session finished (key={})", task_key);
            }
            let _ = finished_tx.send(true);
        });
        sessions.insert(
            key.clone(),
            Slot::Active(ActiveSession {
                generation,
                info: info.clone(),
                cancel,
                handle,
                finished,
            }),
        );
        drop(sessions);
        reservation.disarm();

        info!(
            "Started monitoring (key={}, index={}, interval={}s, duration={}s)",
            key, index, interval_secs, duration_secs
        );
        Ok(info)
    }

    /// Cancels and deregisters the session for (device, interface)
    pub fn stop(&self, device: &str, interface: &str) -> Result<MonitoringSession> {
        let key = self.series_key(device, interface)?;
        let mut sessions = lock(&self.sessions);
        match sessions.remove(&key) {
            Some(Slot::Active(session)) => {
                session.cancel.cancel();
                info!("Stopped monitoring (key={})", key);
                Ok(session.info)
            }
            Some(reserved @ Slot::Reserved { .. }) => {
                // Still starting; leave the reservation to its owner
                sessions.insert(key.clone(), reserved);
                Err(MonitorError::NotActive(key))
            }
            None => Err(MonitorError::NotActive(key)),
        }
    }

    /// Persisted samples for (device, interface)
    pub fn read(&self, device: &str, interface: &str) -> Result<Vec<Sample>> {
        let key = self.series_key(device, interface)?;
        self.store
            .read_samples(&key)?
            .ok_or(MonitorError::NoData(key))
    }

    /// Resolves once the session for (device, interface) has ended,
    /// immediately when none is active
    pub async fn wait(&self, device: &str, interface: &str) -> Result<()> {
        let key = self.series_key(device, interface)?;
        let mut finished = match lock(&self.sessions).get(&key) {
            Some(Slot::Active(session)) => session.finished.clone(),
            _ => return Ok(()),
        };
        // A dropped sender means the task is gone as well
        let _ = finished.wait_for(|done| *done).await;
        Ok(())
    }

    pub fn is_active(&self, device: &str, interface: &str) -> bool {
        self.series_key(device, interface)
            .map(|key| matches!(lock(&self.sessions).get(&key), Some(Slot::Active(_))))
            .unwrap_or(false)
    }

    pub fn active_sessions(&self) -> Vec<MonitoringSession> {
        let mut active: Vec<MonitoringSession> = lock(&self.sessions)
            .values()
            .filter_map(|slot| match slot {
                Slot::Active(session) => Some(session.info.clone()),
                Slot::Reserved { .. } => None,
            })
            .collect();
        active.sort_by(|a, b| a.key().cmp(&b.key()));
        active
    }

    /// Cancels every session and waits for the polling loops to exit
    pub async fn shutdown(&self) {
        let drained: Vec<ActiveSession> = lock(&self.sessions)
            .drain()
            .filter_map(|(_, slot)| match slot {
                Slot::Active(session) => Some(session),
                Slot::Reserved { .. } => None,
            })
            .collect();

        if !drained.is_empty() {
            info!("Stopping {} monitoring session(s)", drained.len());
        }
        for session in &drained {
            session.cancel.cancel();
        }
        for session in drained {
            if let Err(e) = session.handle.await {
                warn!("Monitoring task for {} ended abnormally: {}", session.info.key(), e);
            }
        }
    }
}

/// One session's polling loop
struct Poller {
    client: SnmpClient,
    key: SeriesKey,
    counter: Oid,
    interval: Duration,
    duration: Duration,
    store: Arc<dyn TelemetryStore>,
}

impl Poller {
    async fn run(self, cancel: CancellationToken) {
        let started = Instant::now();
        while started.elapsed() < self.duration {
            let value = tokio::select! {
                _ = cancel.cancelled() => break,
                value = self.client.get(&self.counter) => value,
            };

            match value.as_ref().and_then(|v| v.counter()) {
                Some(value) => {
                    let sample = Sample {
                        timestamp: Utc::now(),
                        value,
                    };
                    match self.store.append_sample(&self.key, &sample) {
                        Ok(()) => debug!("[{}] ifInOctets={}", self.key, value),
                        Err(e) => warn!("Failed to persist sample for {}: {}", self.key, e),
                    }
                }
                None => debug!("[{}] no counter value this tick (value={:?})", self.key, value),
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
