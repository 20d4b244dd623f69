//! Error types for the SNMP protocol access layer
//!
//! Callers of [`crate::snmp::SnmpClient::get`] and [`crate::snmp::SnmpClient::walk`]
//! never see these: they collapse into `None` / a shortened sequence. They surface
//! only through the reachability-aware entry points used by discovery.

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SnmpError {
    #[error("Could not open SNMP session to {target}: {source}")]
    Connect {
        target: String,
        #[source]
        source: async_snmp::Error,
    },

    #[error("SNMP request to {target} failed: {source}")]
    Request {
        target: String,
        #[source]
        source: async_snmp::Error,
    },

    #[error("No response from {target} within {timeout:?}")]
    Timeout { target: String, timeout: Duration },
}

impl SnmpError {
    /// Transport failures mean the agent could not be reached at all,
    /// as opposed to an agent that answered with an error status
    pub fn is_transport(&self) -> bool {
        match self {
            SnmpError::Connect { .. } | SnmpError::Timeout { .. } => true,
            SnmpError::Request { source, .. } => {
                !matches!(source, async_snmp::Error::Snmp { .. })
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SnmpError>;
