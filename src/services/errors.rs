use thiserror::Error;

use crate::analyzers::DiscoveryError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum TopologyServiceError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Topology refresh is already running")]
    AlreadyRunning,

    #[error("Topology refresh is not running")]
    NotRunning,

    #[error("Refresh interval must be at least one second")]
    InvalidInterval,
}

#[derive(Debug, Error)]
pub enum DeviceInfoError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),
}
