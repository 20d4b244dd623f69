pub mod device_info;
pub mod errors;
pub mod monitor;
pub mod traps;

pub use device_info::DeviceInfoCollector;
pub use errors::{CaptureError, MonitorError};
pub use monitor::MonitoringScheduler;
pub use traps::TrapListener;
