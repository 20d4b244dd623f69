//! Text and numeric views over SMI values
//!
//! Octet strings render as text when every byte is printable and as
//! `0x`-prefixed lowercase hex otherwise; numbers in decimal, oids dotted,
//! IpAddress as a dotted quad.

use async_snmp::Value;
use std::net::Ipv4Addr;

pub trait ValueExt {
    /// Display form stored with samples, traps and interface records
    fn pretty(&self) -> String;

    /// Octet strings always as `0x` hex, whatever their content
    fn hex_string(&self) -> String;

    /// Numeric view used for counters; negative integers have no counter meaning
    fn counter(&self) -> Option<u64>;

    /// noSuchObject / noSuchInstance / endOfMibView
    fn is_absent(&self) -> bool;
}

fn is_printable(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .all(|b| (0x20..0x7F).contains(b) || matches!(b, b'\t' | b'\n' | b'\r'))
}

impl ValueExt for Value {
    fn pretty(&self) -> String {
        match self {
            Value::Integer(v) => v.to_string(),
            Value::OctetString(bytes) if is_printable(&bytes[..]) => {
                String::from_utf8_lossy(&bytes[..]).into_owned()
            }
            Value::OctetString(bytes) => format!("0x{}", hex::encode(&bytes[..])),
            Value::Null => String::new(),
            Value::ObjectIdentifier(oid) => oid.to_string(),
            Value::IpAddress(octets) => Ipv4Addr::from(*octets).to_string(),
            Value::Counter32(v) => v.to_string(),
            Value::Gauge32(v) => v.to_string(),
            Value::TimeTicks(v) => v.to_string(),
            Value::Counter64(v) => v.to_string(),
            other => other.to_string(),
        }
    }

    fn hex_string(&self) -> String {
        match self {
            Value::OctetString(bytes) => format!("0x{}", hex::encode(&bytes[..])),
            Value::IpAddress(octets) => {
                format!("0x{}", hex::encode(Ipv4Addr::from(*octets).octets()))
            }
            other => other.pretty(),
        }
    }

    fn counter(&self) -> Option<u64> {
        match self {
            Value::Integer(v) => u64::try_from(*v).ok(),
            Value::Counter32(v) => Some(u64::from(*v)),
            Value::Gauge32(v) => Some(u64::from(*v)),
            Value::TimeTicks(v) => Some(u64::from(*v)),
            Value::Counter64(v) => Some(*v),
            Value::OctetString(bytes) => std::str::from_utf8(&bytes[..]).ok()?.trim().parse().ok(),
            _ => None,
        }
    }

    fn is_absent(&self) -> bool {
        matches!(
            self,
            Value::NoSuchObject | Value::NoSuchInstance | Value::EndOfMibView
        )
    }
}
