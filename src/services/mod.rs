pub mod device_info_service;
pub mod errors;
pub mod runtime;
pub mod topology_service;

pub use device_info_service::{DeviceInfoEntry, DeviceInfoService};
pub use errors::{DeviceInfoError, TopologyServiceError};
pub use runtime::Runtime;
pub use topology_service::TopologyService;
