// TrapClassifier: maps a notification's variable bindings to a link event class
// Later matching bindings override earlier ones

use std::collections::BTreeMap;

use crate::models::TrapType;
use crate::snmp::{Oid, Value, ValueExt, VarBind, mib};

/// Classification from the value of `snmpTrapOID.0`
fn class_from_trap_oid(value: &Value) -> Option<TrapType> {
    if let Value::ObjectIdentifier(oid) = value {
        if mib::is(oid, mib::LINK_UP) {
            return Some(TrapType::LinkUp);
        }
        if mib::is(oid, mib::LINK_DOWN) {
            return Some(TrapType::LinkDown);
        }
    }

    // Symbolic renderings, e.g. "IF-MIB::linkDown"
    let text = value.pretty();
    if text.ends_with("linkUp") {
        Some(TrapType::LinkUp)
    } else if text.ends_with("linkDown") {
        Some(TrapType::LinkDown)
    } else {
        None
    }
}

/// Classification from a binding whose oid is itself a link notification oid
fn class_from_binding_oid(oid: &Oid) -> Option<TrapType> {
    if mib::is(oid, mib::LINK_DOWN) {
        Some(TrapType::LinkDown)
    } else if mib::is(oid, mib::LINK_UP) {
        Some(TrapType::LinkUp)
    } else {
        None
    }
}

pub fn classify(varbinds: &[VarBind]) -> TrapType {
    let mut class = TrapType::Unknown;

    for varbind in varbinds {
        if mib::is(&varbind.oid, mib::SNMP_TRAP_OID_INSTANCE) {
            if let Some(found) = class_from_trap_oid(&varbind.value) {
                class = found;
            }
        }
        if let Some(found) = class_from_binding_oid(&varbind.oid) {
            class = found;
        }
    }
    class
}

/// Binding oid to rendered value, as stored with each event
pub fn render_vars(varbinds: &[VarBind]) -> BTreeMap<String, String> {
    varbinds
        .iter()
        .map(|vb| (vb.oid.to_string(), vb.value.pretty()))
        .collect()
}
