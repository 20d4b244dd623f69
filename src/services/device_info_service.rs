use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::DeviceInfoError;
use crate::collectors::DeviceInfoCollector;
use crate::inventory::Inventory;
use crate::models::{DeviceDescriptor, GeneralInfo, InterfaceRecord, NeighborRecord};
use crate::snmp::Connector;

pub type Result<T> = std::result::Result<T, DeviceInfoError>;

/// Role/organization shown for devices the inventory leaves unlabelled
pub const UNDEFINED: &str = "undefined";

/// General info of one inventory device, tagged with its address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfoEntry {
    pub address: String,
    #[serde(flatten)]
    pub info: GeneralInfo,
}

pub struct DeviceInfoService {
    inventory: Arc<Inventory>,
    connector: Arc<dyn Connector>,
}

impl DeviceInfoService {
    pub fn new(inventory: Arc<Inventory>, connector: Arc<dyn Connector>) -> Self {
        Self {
            inventory,
            connector,
        }
    }

    fn collector(&self, key: &str) -> Result<(DeviceDescriptor, DeviceInfoCollector)> {
        let device = self
            .inventory
            .find(key)
            .cloned()
            .ok_or_else(|| DeviceInfoError::DeviceNotFound(key.to_string()))?;
        let collector = DeviceInfoCollector::new(self.connector.connect(&device));
        Ok((device, collector))
    }

    async fn general_info(device: &DeviceDescriptor, collector: &DeviceInfoCollector) -> GeneralInfo {
        let label = |value: &Option<String>| {
            Some(value.clone().unwrap_or_else(|| UNDEFINED.to_string()))
        };
        collector
            .general_info(label(&device.role), label(&device.organization))
            .await
    }

    /// General info of every inventory device, in inventory order
    pub async fn all_device_info(&self) -> Vec<DeviceInfoEntry> {
        let mut entries = Vec::with_capacity(self.inventory.len());
        for device in self.inventory.devices() {
            let collector = DeviceInfoCollector::new(self.connector.connect(device));
            entries.push(DeviceInfoEntry {
                address: device.address.clone(),
                info: Self::general_info(device, &collector).await,
            });
        }
        entries
    }

    pub async fn device_info(&self, key: &str) -> Result<GeneralInfo> {
        let (device, collector) = self.collector(key)?;
        Ok(Self::general_info(&device, &collector).await)
    }

    pub async fn interfaces(&self, key: &str) -> Result<Vec<InterfaceRecord>> {
        let (_, collector) = self.collector(key)?;
        Ok(collector.interfaces().await)
    }

    pub async fn neighbors(&self, key: &str) -> Result<Vec<NeighborRecord>> {
        let (_, collector) = self.collector(key)?;
        Ok(collector.neighbors().await)
    }
}
