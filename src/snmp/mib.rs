//! Well-known object identifiers used by the collectors and the trap listener

use async_snmp::Oid;

// SNMPv2-MIB system group
pub const SYS_DESCR_INSTANCE: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 1, 0];
pub const SYS_UPTIME_INSTANCE: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 3, 0];
pub const SYS_NAME_INSTANCE: &[u32] = &[1, 3, 6, 1, 2, 1, 1, 5, 0];

// IF-MIB ifTable / ifXTable columns
pub const IF_DESCR: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2];
pub const IF_TYPE: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 3];
pub const IF_OPER_STATUS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8];
pub const IF_IN_OCTETS: &[u32] = &[1, 3, 6, 1, 2, 1, 2, 2, 1, 10];
pub const IF_NAME: &[u32] = &[1, 3, 6, 1, 2, 1, 31, 1, 1, 1, 1];

// IP-MIB ipAddrTable columns, rows indexed by the IPv4 address
pub const IP_AD_ENT_IF_INDEX: &[u32] = &[1, 3, 6, 1, 2, 1, 4, 20, 1, 2];
pub const IP_AD_ENT_NET_MASK: &[u32] = &[1, 3, 6, 1, 2, 1, 4, 20, 1, 3];

// CISCO-CDP-MIB cdpCacheTable columns
pub const CDP_CACHE_ADDRESS: &[u32] = &[1, 3, 6, 1, 4, 1, 9, 9, 23, 1, 2, 1, 1, 4];
pub const CDP_CACHE_DEVICE_ID: &[u32] = &[1, 3, 6, 1, 4, 1, 9, 9, 23, 1, 2, 1, 1, 6];

// SNMPv2-MIB notifications
pub const SNMP_TRAP_OID_INSTANCE: &[u32] = &[1, 3, 6, 1, 6, 3, 1, 1, 4, 1, 0];
pub const LINK_DOWN: &[u32] = &[1, 3, 6, 1, 6, 3, 1, 1, 5, 3];
pub const LINK_UP: &[u32] = &[1, 3, 6, 1, 6, 3, 1, 1, 5, 4];

pub fn oid(arcs: &[u32]) -> Oid {
    Oid::from_slice(arcs)
}

/// `base` with `arcs` appended
pub fn extend(base: &[u32], arcs: &[u32]) -> Oid {
    let joined: Vec<u32> = base.iter().chain(arcs).copied().collect();
    Oid::from_slice(&joined)
}

/// Column oid with the row index appended
pub fn instance(column: &[u32], index: u32) -> Oid {
    extend(column, &[index])
}

/// Prefix test on the arc sequence
pub fn within(oid: &Oid, base: &Oid) -> bool {
    oid.arcs().starts_with(base.arcs())
}

/// Last arc, the row index of a single-index table column
pub fn row_index(oid: &Oid) -> Option<u32> {
    oid.arcs().last().copied()
}

/// The last `n` arcs, or `None` when the oid is shorter
pub fn trailing(oid: &Oid, n: usize) -> Option<&[u32]> {
    let arcs = oid.arcs();
    arcs.len().checked_sub(n).map(|start| &arcs[start..])
}

pub fn is(oid: &Oid, arcs: &[u32]) -> bool {
    oid.arcs() == arcs
}
