use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identity of a per-(device, interface) series: monitoring sessions, sample
/// logs, trap subscriptions and trap logs are all keyed this way
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub device: String,
    pub interface: String,
}

impl SeriesKey {
    pub fn new(device: impl Into<String>, interface: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            interface: interface.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.device, self.interface)
    }
}

/// One counter reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: u64,
}

/// Public view of a registered monitoring session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSession {
    pub device: String,
    pub interface: String,
    pub interval_secs: u64,
    pub duration_secs: u64,
    pub started_at: DateTime<Utc>,
}

impl MonitoringSession {
    pub fn key(&self) -> SeriesKey {
        SeriesKey::new(&self.device, &self.interface)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrapType {
    #[serde(rename = "linkUp")]
    LinkUp,
    #[serde(rename = "linkDown")]
    LinkDown,
    #[serde(rename = "unknown")]
    Unknown,
}

impl fmt::Display for TrapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrapType::LinkUp => "linkUp",
            TrapType::LinkDown => "linkDown",
            TrapType::Unknown => "unknown",
        })
    }
}

/// A classified notification as stored for a subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrapEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub trap_type: TrapType,
    /// Binding oid to stringified value
    pub vars: BTreeMap<String, String>,
}

/// Answer to a capture status query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureStatus {
    pub device: String,
    pub interface: String,
    pub capture_active: bool,
    pub has_data: bool,
}
