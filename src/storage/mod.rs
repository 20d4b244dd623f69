//! Append-only persistence for samples, trap events and topology snapshots

pub mod errors;
pub mod json_store;
pub mod schema;
pub mod sqlite_store;

pub use errors::StorageError;
pub use json_store::JsonFileStore;
pub use sqlite_store::SqliteStore;

use crate::models::{Sample, SeriesKey, TopologySnapshot, TrapEvent};
use errors::Result;

/// Persistence contract shared by every backend
///
/// Series are keyed by (device, interface). Reading a series that was never
/// written returns `None`, never an error.
pub trait TelemetryStore: Send + Sync {
    fn append_sample(&self, key: &SeriesKey, sample: &Sample) -> Result<()>;

    fn read_samples(&self, key: &SeriesKey) -> Result<Option<Vec<Sample>>>;

    fn append_trap(&self, key: &SeriesKey, event: &TrapEvent) -> Result<()>;

    fn read_traps(&self, key: &SeriesKey) -> Result<Option<Vec<TrapEvent>>>;

    /// Whether a trap series was ever written for `key`
    fn has_traps(&self, key: &SeriesKey) -> Result<bool> {
        Ok(self.read_traps(key)?.is_some())
    }

    fn save_topology(&self, snapshot: &TopologySnapshot) -> Result<()>;

    fn load_topology(&self) -> Result<Option<TopologySnapshot>>;
}
