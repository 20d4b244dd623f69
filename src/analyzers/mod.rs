pub mod topology;
pub mod trap_classifier;

pub use topology::{DiscoveryError, TopologyDiscovery, VisitOutcome};
pub use trap_classifier::classify;
