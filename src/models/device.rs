use serde::{Deserialize, Serialize};

pub const DEFAULT_COMMUNITY: &str = "public";
pub const DEFAULT_SNMP_PORT: u16 = 161;

fn default_community() -> String {
    DEFAULT_COMMUNITY.to_string()
}

fn default_port() -> u16 {
    DEFAULT_SNMP_PORT
}

/// One polling/discovery target as supplied by the inventory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// IP address (or resolvable host) the agent listens on
    pub address: String,
    /// Name the device announces itself with, also used in topology edges
    #[serde(alias = "name")]
    pub display_name: String,
    #[serde(default = "default_community")]
    pub community: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
}

impl DeviceDescriptor {
    pub fn new(address: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: display_name.into(),
            community: default_community(),
            port: default_port(),
            hostname: None,
            role: None,
            organization: None,
        }
    }

    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = community.into();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// True when `key` names this device by address, hostname or display name
    pub fn matches(&self, key: &str) -> bool {
        self.address == key
            || self.hostname.as_deref() == Some(key)
            || self.display_name == key
    }
}

/// ifOperStatus as reported by IF-MIB
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperStatus {
    Up,
    Down,
    Testing,
    Unknown,
}

impl OperStatus {
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "1" => OperStatus::Up,
            "2" => OperStatus::Down,
            "3" => OperStatus::Testing,
            _ => OperStatus::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub name: String,
    pub index: u32,
    #[serde(rename = "type")]
    pub if_type: String,
    pub ip_address: String,
    pub subnet_mask: String,
    pub oper_status: OperStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveInterface {
    pub name: String,
    pub status: String,
}

/// Summary of one device: identity, OS banner and interfaces currently up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralInfo {
    pub name: Option<String>,
    pub operating_system: Option<String>,
    pub active_interfaces: Vec<ActiveInterface>,
    pub role: Option<String>,
    pub organization: Option<String>,
}

/// A directly adjacent device as seen in the CDP cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeighborRecord {
    pub display_name: String,
    pub address: String,
}
