//! Process-scoped registry of the long-lived services
//!
//! Built once at startup and drained with [`Runtime::shutdown`].

use anyhow::{Context, Result};
use log::{info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::device_info_service::DeviceInfoService;
use super::topology_service::TopologyService;
use crate::analyzers::TopologyDiscovery;
use crate::collectors::{CaptureError, MonitoringScheduler, TrapListener};
use crate::config::{AppConfig, StorageBackend};
use crate::inventory::Inventory;
use crate::snmp::{Connector, UdpConnector};
use crate::storage::{JsonFileStore, SqliteStore, TelemetryStore};

struct ListenerTask {
    local_addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct Runtime {
    config: AppConfig,
    inventory: Arc<Inventory>,
    store: Arc<dyn TelemetryStore>,
    monitor: MonitoringScheduler,
    traps: Arc<TrapListener>,
    device_info: DeviceInfoService,
    topology: Option<Arc<TopologyService>>,
    listener: Mutex<Option<ListenerTask>>,
}

impl Runtime {
    /// Builds the store and UDP connector described by `config`
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn TelemetryStore> = match config.storage.backend {
            StorageBackend::Json => Arc::new(
                JsonFileStore::new(&config.storage.data_dir)
                    .context("Failed to open JSON data directory")?,
            ),
            StorageBackend::Sqlite => Arc::new(
                SqliteStore::new(&config.storage.database)
                    .context("Failed to open SQLite database")?,
            ),
        };
        let connector: Arc<dyn Connector> =
            Arc::new(UdpConnector::new(config.snmp.session_options()));
        Ok(Self::with_parts(config, connector, store))
    }

    /// Wires the services around an explicit connector and store
    pub fn with_parts(
        config: AppConfig,
        connector: Arc<dyn Connector>,
        store: Arc<dyn TelemetryStore>,
    ) -> Self {
        let inventory = Arc::new(Inventory::new(config.devices.clone()));

        let seed = config
            .topology
            .seed
            .clone()
            .or_else(|| inventory.devices().first().map(|d| d.address.clone()));
        let topology = seed.map(|seed| {
            let discovery = TopologyDiscovery::new(inventory.clone(), connector.clone());
            let service = TopologyService::new(discovery, seed, store.clone());
            if let Err(e) = service.set_interval(config.topology.interval_secs) {
                warn!("Keeping default topology interval: {}", e);
            }
            Arc::new(service)
        });

        info!(
            "Runtime ready (devices={}, backend={:?})",
            inventory.len(),
            config.storage.backend
        );
        Self {
            monitor: MonitoringScheduler::new(inventory.clone(), connector.clone(), store.clone()),
            traps: Arc::new(TrapListener::new(inventory.clone(), store.clone())),
            device_info: DeviceInfoService::new(inventory.clone(), connector),
            topology,
            listener: Mutex::new(None),
            config,
            inventory,
            store,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn store(&self) -> &Arc<dyn TelemetryStore> {
        &self.store
    }

    pub fn monitor(&self) -> &MonitoringScheduler {
        &self.monitor
    }

    pub fn traps(&self) -> &Arc<TrapListener> {
        &self.traps
    }

    pub fn device_info(&self) -> &DeviceInfoService {
        &self.device_info
    }

    /// Topology service, present when a discovery seed is known
    pub fn topology(&self) -> Option<&Arc<TopologyService>> {
        self.topology.as_ref()
    }

    /// Binds the notification socket once; later calls fail with `AlreadyRunning`
    pub async fn start_listener(&self) -> std::result::Result<SocketAddr, CaptureError> {
        // Held across the bind so concurrent callers queue behind it
        let mut slot = self.listener.lock().await;
        if slot.is_some() {
            return Err(CaptureError::AlreadyRunning);
        }

        let receiver = TrapListener::bind(self.config.listener.socket_addr()).await?;
        let local_addr = receiver.local_addr();
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(self.traps.clone().run(receiver, cancel.clone()));
        *slot = Some(ListenerTask {
            local_addr,
            cancel,
            handle,
        });
        Ok(local_addr)
    }

    pub async fn listener_addr(&self) -> Option<SocketAddr> {
        self.listener.lock().await.as_ref().map(|task| task.local_addr)
    }

    /// Starts the background services enabled in configuration
    pub async fn start(&self) -> Result<()> {
        if self.config.listener.enabled {
            self.start_listener()
                .await
                .context("Failed to start trap listener")?;
        }
        if self.config.topology.auto_refresh {
            match &self.topology {
                Some(topology) => topology
                    .start()
                    .context("Failed to start topology refresh")?,
                None => warn!("Topology auto refresh requested but no seed device is configured"),
            }
        }
        Ok(())
    }

    /// Stops every background task and waits for them to exit
    pub async fn shutdown(&self) {
        self.monitor.shutdown().await;

        if let Some(topology) = &self.topology {
            // NotRunning is the common case here
            let _ = topology.stop().await;
        }

        let listener = self.listener.lock().await.take();
        if let Some(task) = listener {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!("Trap listener task ended abnormally: {}", e);
            }
        }
        info!("Runtime shut down");
    }
}
