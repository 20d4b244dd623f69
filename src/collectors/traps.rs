//! Notification receiver and trap capture subscriptions

use async_snmp::{Notification, NotificationReceiver};
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use super::errors::CaptureError;
use crate::analyzers::trap_classifier::{classify, render_vars};
use crate::inventory::Inventory;
use crate::models::{CaptureStatus, SeriesKey, TrapEvent};
use crate::snmp::{Value, VarBind, mib};
use crate::storage::TelemetryStore;

pub type Result<T> = std::result::Result<T, CaptureError>;

pub const DEFAULT_TRAP_PORT: u16 = 162;

/// A notification as one v2-style binding list: `snmpTrapOID.0` first, then
/// the payload. The receiver derives the trap oid of v1 traps from their
/// generic/specific numbers.
pub fn notification_varbinds(notification: &Notification) -> Vec<VarBind> {
    let trap_oid = VarBind::new(
        mib::oid(mib::SNMP_TRAP_OID_INSTANCE),
        Value::ObjectIdentifier(notification.trap_oid().clone()),
    );
    std::iter::once(trap_oid)
        .chain(
            notification
                .varbinds()
                .iter()
                .filter(|vb| {
                    !mib::is(&vb.oid, mib::SYS_UPTIME_INSTANCE)
                        && !mib::is(&vb.oid, mib::SNMP_TRAP_OID_INSTANCE)
                })
                .cloned(),
        )
        .collect()
}

pub struct TrapListener {
    inventory: Arc<Inventory>,
    store: Arc<dyn TelemetryStore>,
    subscriptions: Mutex<BTreeSet<SeriesKey>>,
}

impl TrapListener {
    pub fn new(inventory: Arc<Inventory>, store: Arc<dyn TelemetryStore>) -> Self {
        Self {
            inventory,
            store,
            subscriptions: Mutex::new(BTreeSet::new()),
        }
    }

    fn subscriptions(&self) -> MutexGuard<'_, BTreeSet<SeriesKey>> {
        self.subscriptions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn series_key(&self, device: &str, interface: &str) -> Result<SeriesKey> {
        let descriptor = self
            .inventory
            .find(device)
            .ok_or_else(|| CaptureError::DeviceNotFound(device.to_string()))?;
        Ok(SeriesKey::new(&descriptor.address, interface))
    }

    pub fn start_capture(&self, device: &str, interface: &str) -> Result<SeriesKey> {
        let key = self.series_key(device, interface)?;
        if !self.subscriptions().insert(key.clone()) {
            return Err(CaptureError::AlreadyActive(key));
        }
        info!("Trap capture started (key={})", key);
        Ok(key)
    }

    pub fn stop_capture(&self, device: &str, interface: &str) -> Result<SeriesKey> {
        let key = self.series_key(device, interface)?;
        if !self.subscriptions().remove(&key) {
            return Err(CaptureError::NotActive(key));
        }
        info!("Trap capture stopped (key={})", key);
        Ok(key)
    }

    pub fn status(&self, device: &str, interface: &str) -> Result<CaptureStatus> {
        let key = self.series_key(device, interface)?;
        let capture_active = self.subscriptions().contains(&key);
        let has_data = self.store.has_traps(&key)?;
        Ok(CaptureStatus {
            device: key.device,
            interface: key.interface,
            capture_active,
            has_data,
        })
    }

    /// Captured events for (device, interface); empty when none were recorded
    pub fn events(&self, device: &str, interface: &str) -> Result<Vec<TrapEvent>> {
        let key = self.series_key(device, interface)?;
        Ok(self.store.read_traps(&key)?.unwrap_or_default())
    }

    pub fn active_captures(&self) -> Vec<SeriesKey> {
        self.subscriptions().iter().cloned().collect()
    }

    /// Classifies one notification and appends it to every capture of the
    /// sending device. Returns the number of events persisted.
    pub fn handle_notification(&self, source: IpAddr, notification: &Notification) -> usize {
        self.handle_varbinds(source, &notification_varbinds(notification))
    }

    pub fn handle_varbinds(&self, source: IpAddr, varbinds: &[VarBind]) -> usize {
        let source = source.to_canonical().to_string();
        self.deliver(&source, varbinds)
    }

    fn deliver(&self, source: &str, varbinds: &[VarBind]) -> usize {
        let event = TrapEvent {
            timestamp: Utc::now(),
            trap_type: classify(varbinds),
            vars: render_vars(varbinds),
        };
        info!("Trap {} from {} @ {}", event.trap_type, source, event.timestamp);

        let targets: Vec<SeriesKey> = self
            .subscriptions()
            .iter()
            .filter(|key| key.device == source)
            .cloned()
            .collect();

        let mut delivered = 0;
        for key in targets {
            match self.store.append_trap(&key, &event) {
                Ok(()) => delivered += 1,
                Err(e) => warn!("Failed to persist trap for {}: {}", key, e),
            }
        }
        delivered
    }

    /// Binds the notification receiver
    pub async fn bind(addr: SocketAddr) -> Result<NotificationReceiver> {
        let receiver = NotificationReceiver::bind(addr.to_string())
            .await
            .map_err(|source| CaptureError::Bind { addr, source })?;
        info!("Trap listener bound on {}", receiver.local_addr());
        Ok(receiver)
    }

    /// Receive loop; returns when `cancel` fires
    pub async fn run(self: Arc<Self>, receiver: NotificationReceiver, cancel: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = receiver.recv() => match received {
                    Ok((notification, from)) => {
                        debug!("Notification from {} ({} bindings)", from, notification.varbinds().len());
                        self.handle_notification(from.ip(), &notification);
                    }
                    // One bad datagram never stops the loop
                    Err(e) => warn!("Dropping undecodable notification: {}", e),
                },
            }
        }
        info!("Trap listener stopped");
    }
}
