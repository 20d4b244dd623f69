//! Structured device views built from raw MIB walks

use log::{debug, warn};
use std::collections::HashMap;

use crate::models::{ActiveInterface, GeneralInfo, InterfaceRecord, NeighborRecord, OperStatus};
use crate::snmp::errors::Result as SnmpResult;
use crate::snmp::{Oid, SnmpClient, Value, ValueExt, mib};

pub const UNKNOWN_TYPE: &str = "unknown";
pub const UNASSIGNED_ADDRESS: &str = "Unassigned";
pub const UNKNOWN_MASK: &str = "Unknown";

/// Queries one device and shapes the answers into records
#[derive(Debug, Clone)]
pub struct DeviceInfoCollector {
    client: SnmpClient,
}

impl DeviceInfoCollector {
    pub fn new(client: SnmpClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SnmpClient {
        &self.client
    }

    /// Interface table, one record per ifName row
    pub async fn interfaces(&self) -> Vec<InterfaceRecord> {
        let types = self.client.walk(&mib::oid(mib::IF_TYPE)).await;
        let statuses = self.client.walk(&mib::oid(mib::IF_OPER_STATUS)).await;
        let names = self.client.walk(&mib::oid(mib::IF_NAME)).await;
        let ip_to_index = self.client.walk(&mib::oid(mib::IP_AD_ENT_IF_INDEX)).await;
        let masks = self.client.walk(&mib::oid(mib::IP_AD_ENT_NET_MASK)).await;

        build_interface_table(&names, &types, &statuses, &ip_to_index, &masks)
    }

    /// ifIndex of the interface called `name`, from one interface-table query
    pub async fn resolve_interface_index(&self, name: &str) -> Option<u32> {
        self.interfaces()
            .await
            .into_iter()
            .find(|record| record.name == name)
            .map(|record| record.index)
    }

    /// Identity, OS banner and the interfaces currently up
    pub async fn general_info(
        &self,
        role: Option<String>,
        organization: Option<String>,
    ) -> GeneralInfo {
        let name = self
            .client
            .get_string(&mib::oid(mib::SYS_NAME_INSTANCE))
            .await;
        let operating_system = self
            .client
            .get(&mib::oid(mib::SYS_DESCR_INSTANCE))
            .await
            .map(|descr| decode_hex_string(&descr.hex_string()));

        let statuses = self.client.walk(&mib::oid(mib::IF_OPER_STATUS)).await;
        let descriptions = self.client.walk(&mib::oid(mib::IF_DESCR)).await;

        GeneralInfo {
            name,
            operating_system,
            active_interfaces: active_interfaces(&statuses, &descriptions),
            role,
            organization,
        }
    }

    /// CDP neighbors; an empty list when the table cannot be read
    pub async fn neighbors(&self) -> Vec<NeighborRecord> {
        match self.neighbors_checked().await {
            Ok(neighbors) => neighbors,
            Err(e) => {
                warn!(
                    "Could not read CDP neighbors of {}: {}",
                    self.client.target(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// CDP neighbors, reporting an unreachable device as an error
    pub async fn neighbors_checked(&self) -> SnmpResult<Vec<NeighborRecord>> {
        let names = self
            .client
            .try_walk(&mib::oid(mib::CDP_CACHE_DEVICE_ID))
            .await?;
        let addresses = self
            .client
            .try_walk(&mib::oid(mib::CDP_CACHE_ADDRESS))
            .await?;
        Ok(zip_neighbors(&names, &addresses).unwrap_or_else(|| {
            warn!(
                "Unparseable CDP address on {} - ignoring its neighbor table",
                self.client.target()
            );
            Vec::new()
        }))
    }
}

/// Joins the interface columns on their trailing row index
pub fn build_interface_table(
    names: &[(Oid, Value)],
    types: &[(Oid, Value)],
    statuses: &[(Oid, Value)],
    ip_to_index: &[(Oid, Value)],
    masks: &[(Oid, Value)],
) -> Vec<InterfaceRecord> {
    let by_index = |column: &[(Oid, Value)]| -> HashMap<u32, String> {
        column
            .iter()
            .filter_map(|(oid, value)| Some((mib::row_index(oid)?, value.pretty())))
            .collect()
    };
    let types = by_index(types);
    let statuses = by_index(statuses);

    // ipAdEntIfIndex rows are indexed by the address itself
    let mut addresses: HashMap<u32, (String, String)> = HashMap::new();
    for (oid, value) in ip_to_index {
        let Some(index) = value.counter().and_then(|v| u32::try_from(v).ok()) else {
            continue;
        };
        if addresses.contains_key(&index) {
            continue;
        }
        let Some(address) = mib::trailing(oid, 4) else {
            continue;
        };
        let ip = address
            .iter()
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(".");
        let mask_oid = mib::extend(mib::IP_AD_ENT_NET_MASK, address);
        let mask = masks
            .iter()
            .find(|(oid, _)| *oid == mask_oid)
            .map(|(_, mask)| mask.pretty())
            .unwrap_or_else(|| UNKNOWN_MASK.to_string());
        addresses.insert(index, (ip, mask));
    }

    names
        .iter()
        .filter_map(|(oid, name)| {
            let index = mib::row_index(oid)?;
            let (ip_address, subnet_mask) = addresses
                .get(&index)
                .cloned()
                .unwrap_or_else(|| (UNASSIGNED_ADDRESS.to_string(), UNKNOWN_MASK.to_string()));
            Some(InterfaceRecord {
                name: name.pretty(),
                index,
                if_type: types
                    .get(&index)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
                ip_address,
                subnet_mask,
                oper_status: statuses
                    .get(&index)
                    .map(|code| OperStatus::from_code(code))
                    .unwrap_or(OperStatus::Unknown),
            })
        })
        .collect()
}

/// Interfaces whose ifOperStatus is up, named by ifDescr
pub fn active_interfaces(
    statuses: &[(Oid, Value)],
    descriptions: &[(Oid, Value)],
) -> Vec<ActiveInterface> {
    let names: HashMap<u32, String> = descriptions
        .iter()
        .filter_map(|(oid, value)| Some((mib::row_index(oid)?, value.pretty())))
        .collect();

    statuses
        .iter()
        .filter(|(_, status)| status.counter() == Some(1))
        .filter_map(|(oid, _)| {
            let index = mib::row_index(oid)?;
            Some(ActiveInterface {
                name: names
                    .get(&index)
                    .cloned()
                    .unwrap_or_else(|| format!("Unknown {index}")),
                status: "active".to_string(),
            })
        })
        .collect()
}

/// Pairs device ids with addresses by position. `None` when an address
/// does not parse.
pub fn zip_neighbors(
    names: &[(Oid, Value)],
    addresses: &[(Oid, Value)],
) -> Option<Vec<NeighborRecord>> {
    if names.len() != addresses.len() {
        debug!(
            "CDP columns differ in length (names={}, addresses={})",
            names.len(),
            addresses.len()
        );
    }
    names
        .iter()
        .zip(addresses)
        .map(|((_, name), (_, address))| {
            Some(NeighborRecord {
                display_name: name.pretty(),
                address: parse_ip_from_hex(&address.hex_string())?,
            })
        })
        .collect()
}

/// Decodes a hex-rendered byte string to text
///
/// Accepts an optional `0x` prefix and ignores whitespace. Invalid UTF-8
/// sequences are dropped. Input that is not valid hex comes back unchanged.
pub fn decode_hex_string(input: &str) -> String {
    let digits: String = input
        .strip_prefix("0x")
        .unwrap_or(input)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    match hex::decode(&digits) {
        Ok(bytes) => bytes.utf8_chunks().map(|chunk| chunk.valid()).collect(),
        Err(_) => input.to_string(),
    }
}

/// `0xC0A80101` -> `192.168.1.1`
pub fn parse_ip_from_hex(input: &str) -> Option<String> {
    let digits = input.strip_prefix("0x").unwrap_or(input);
    let bytes = hex::decode(digits).ok()?;
    if bytes.is_empty() {
        return None;
    }
    Some(
        bytes
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join("."),
    )
}
