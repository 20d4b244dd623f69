pub mod device;
pub mod telemetry;
pub mod topology;

pub use device::{
    ActiveInterface, DeviceDescriptor, GeneralInfo, InterfaceRecord, NeighborRecord, OperStatus,
};
pub use telemetry::{CaptureStatus, MonitoringSession, Sample, SeriesKey, TrapEvent, TrapType};
pub use topology::{TopologyEdge, TopologySnapshot};
