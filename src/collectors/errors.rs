use std::net::SocketAddr;
use thiserror::Error;

use crate::models::SeriesKey;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Interface {interface} not found on {device}")]
    InterfaceNotFound { device: String, interface: String },

    #[error("Monitoring already active for {0}")]
    AlreadyActive(SeriesKey),

    #[error("No active monitoring session for {0}")]
    NotActive(SeriesKey),

    #[error("No samples recorded for {0}")]
    NoData(SeriesKey),

    #[error("Polling interval must be at least one second")]
    InvalidInterval,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Trap capture already active for {0}")]
    AlreadyActive(SeriesKey),

    #[error("Trap capture not active for {0}")]
    NotActive(SeriesKey),

    #[error("Trap listener is already running")]
    AlreadyRunning,

    #[error("Failed to bind trap listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: async_snmp::Error,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),
}
