use log::{error, info};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::errors::TopologyServiceError;
use crate::analyzers::TopologyDiscovery;
use crate::models::TopologySnapshot;
use crate::storage::TelemetryStore;

pub type Result<T> = std::result::Result<T, TopologyServiceError>;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

struct RefreshTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Keeps the persisted topology snapshot fresh
pub struct TopologyService {
    discovery: TopologyDiscovery,
    seed: String,
    store: Arc<dyn TelemetryStore>,
    interval: Mutex<Duration>,
    task: Mutex<Option<RefreshTask>>,
}

impl TopologyService {
    pub fn new(
        discovery: TopologyDiscovery,
        seed: impl Into<String>,
        store: Arc<dyn TelemetryStore>,
    ) -> Self {
        Self {
            discovery,
            seed: seed.into(),
            store,
            interval: Mutex::new(DEFAULT_REFRESH_INTERVAL),
            task: Mutex::new(None),
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    fn task(&self) -> MutexGuard<'_, Option<RefreshTask>> {
        self.task.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn interval(&self) -> Duration {
        *self.interval.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Changes the refresh period; a running loop picks it up at its next sleep
    pub fn set_interval(&self, secs: u64) -> Result<()> {
        if secs == 0 {
            return Err(TopologyServiceError::InvalidInterval);
        }
        *self.interval.lock().unwrap_or_else(|e| e.into_inner()) = Duration::from_secs(secs);
        info!("Topology refresh interval set to {}s", secs);
        Ok(())
    }

    /// Last persisted snapshot, discovering one first if none exists
    pub async fn current(&self) -> Result<TopologySnapshot> {
        match self.store.load_topology()? {
            Some(snapshot) => Ok(snapshot),
            None => self.refresh().await,
        }
    }

    /// Runs discovery now and persists the result
    pub async fn refresh(&self) -> Result<TopologySnapshot> {
        let snapshot = self.discovery.discover(&self.seed).await?;
        self.store.save_topology(&snapshot)?;
        Ok(snapshot)
    }

    pub fn is_running(&self) -> bool {
        self.task()
            .as_ref()
            .is_some_and(|task| !task.handle.is_finished())
    }

    /// Launches the periodic refresh loop
    pub fn start(self: &Arc<Self>) -> Result<()> {
        let mut task = self.task();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return Err(TopologyServiceError::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let service = Arc::clone(self);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(service.interval()) => {}
                }
                let refreshed = tokio::select! {
                    _ = token.cancelled() => break,
                    refreshed = service.refresh() => refreshed,
                };
                match refreshed {
                    Ok(snapshot) => info!("Topology refreshed (edges={})", snapshot.len()),
                    Err(e) => error!("Topology refresh failed: {}", e),
                }
            }
        });

        *task = Some(RefreshTask { cancel, handle });
        info!(
            "Topology refresh started (seed={}, interval={}s)",
            self.seed,
            self.interval().as_secs()
        );
        Ok(())
    }

    /// Stops the refresh loop and waits for it to exit
    pub async fn stop(&self) -> Result<()> {
        let task = self.task().take();
        match task {
            Some(RefreshTask { cancel, handle }) => {
                cancel.cancel();
                if let Err(e) = handle.await {
                    error!("Topology refresh task ended abnormally: {}", e);
                }
                info!("Topology refresh stopped");
                Ok(())
            }
            None => Err(TopologyServiceError::NotRunning),
        }
    }
}
