pub mod client;
pub mod errors;
pub mod memory;
pub mod mib;
pub mod session;
pub mod values;

pub use async_snmp::{Oid, Value, VarBind};
pub use client::{Connector, RetryPolicy, SessionOptions, SnmpClient, UdpConnector};
pub use errors::SnmpError;
pub use session::{AgentSession, SnmpSession, Version};
pub use values::ValueExt;
