//! SNMP fleet watcher
//!
//! Polls interface counters, captures link traps and rebuilds the physical
//! topology of a device fleet from CDP neighbor tables.

pub mod analyzers;
pub mod cli;
pub mod collectors;
pub mod config;
pub mod inventory;
pub mod models;
pub mod services;
pub mod snmp;
pub mod storage;

pub use crate::config::AppConfig;
pub use crate::inventory::Inventory;
pub use crate::services::Runtime;
