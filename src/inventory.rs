use crate::models::DeviceDescriptor;

/// The device fleet, as listed in configuration
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    devices: Vec<DeviceDescriptor>,
}

impl Inventory {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self { devices }
    }

    /// Looks a device up by address, hostname or display name, in that order
    pub fn find(&self, key: &str) -> Option<&DeviceDescriptor> {
        self.devices
            .iter()
            .find(|d| d.address == key)
            .or_else(|| self.devices.iter().find(|d| d.hostname.as_deref() == Some(key)))
            .or_else(|| self.devices.iter().find(|d| d.display_name == key))
    }

    /// Device whose address matches a datagram's source IP
    pub fn find_by_address(&self, address: &str) -> Option<&DeviceDescriptor> {
        self.devices.iter().find(|d| d.address == address)
    }

    pub fn devices(&self) -> &[DeviceDescriptor] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl FromIterator<DeviceDescriptor> for Inventory {
    fn from_iter<I: IntoIterator<Item = DeviceDescriptor>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_prefers_address_over_names() {
        let mut r1 = DeviceDescriptor::new("10.0.0.1", "R1");
        r1.hostname = Some("core-1".to_string());
        // A display name that collides with another device's address
        let r2 = DeviceDescriptor::new("10.0.0.2", "10.0.0.1");
        let inventory: Inventory = [r2, r1].into_iter().collect();

        assert_eq!(inventory.find("10.0.0.1").unwrap().display_name, "R1");
        assert_eq!(inventory.find("core-1").unwrap().address, "10.0.0.1");
        assert!(inventory.find("R3").is_none());
        assert_eq!(inventory.len(), 2);
    }
}
