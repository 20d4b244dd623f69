use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;

use super::TelemetryStore;
use super::errors::{Result, StorageError};
use crate::models::{Sample, SeriesKey, TopologySnapshot, TrapEvent};

/// One pretty-printed JSON array per series under a data directory
///
/// File names:
/// - samples: `<host with '.'→'_'>_<iface with '/'→'_'>.json`
/// - traps: `traps_<host without '.'>_<iface with '/'→'_'>.json`
/// - topology: `topology.json`
#[derive(Debug)]
pub struct JsonFileStore {
    data_dir: PathBuf,
    // Serializes read-modify-write cycles across series
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir).map_err(|source| StorageError::Io {
            path: data_dir.clone(),
            source,
        })?;
        debug!("JSON store rooted at {}", data_dir.display());
        Ok(Self {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn samples_path(&self, key: &SeriesKey) -> PathBuf {
        self.data_dir.join(format!(
            "{}_{}.json",
            key.device.replace('.', "_"),
            key.interface.replace('/', "_")
        ))
    }

    pub fn traps_path(&self, key: &SeriesKey) -> PathBuf {
        self.data_dir.join(format!(
            "traps_{}_{}.json",
            key.device.replace('.', ""),
            key.interface.replace('/', "_")
        ))
    }

    pub fn topology_path(&self) -> PathBuf {
        self.data_dir.join("topology.json")
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        // Left behind by an interrupted writer; same as never written
        if bytes.iter().all(u8::is_ascii_whitespace) {
            debug!("Treating empty {} as absent", path.display());
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StorageError::Json {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Writes to a sibling temp file, then renames it over `path`
    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        let io_error = |source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        };
        let mut file = NamedTempFile::new_in(&self.data_dir).map_err(io_error)?;
        file.write_all(&bytes).map_err(io_error)?;
        file.as_file().sync_all().map_err(io_error)?;
        file.persist(path).map_err(|e| io_error(e.error))?;
        Ok(())
    }

    fn append<T: Serialize + DeserializeOwned + Clone>(&self, path: &Path, record: &T) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut records: Vec<T> = Self::read_json(path)?.unwrap_or_default();
        records.push(record.clone());
        self.write_json(path, &records)
    }
}

impl TelemetryStore for JsonFileStore {
    fn append_sample(&self, key: &SeriesKey, sample: &Sample) -> Result<()> {
        self.append(&self.samples_path(key), sample)
    }

    fn read_samples(&self, key: &SeriesKey) -> Result<Option<Vec<Sample>>> {
        Self::read_json(&self.samples_path(key))
    }

    fn append_trap(&self, key: &SeriesKey, event: &TrapEvent) -> Result<()> {
        self.append(&self.traps_path(key), event)
    }

    fn read_traps(&self, key: &SeriesKey) -> Result<Option<Vec<TrapEvent>>> {
        Self::read_json(&self.traps_path(key))
    }

    fn save_topology(&self, snapshot: &TopologySnapshot) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.write_json(&self.topology_path(), snapshot)
    }

    fn load_topology(&self) -> Result<Option<TopologySnapshot>> {
        Self::read_json(&self.topology_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TopologyEdge, TrapType};
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn test_file_naming() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let key = SeriesKey::new("10.0.0.1", "Gi0/1");

        assert!(store.samples_path(&key).ends_with("10_0_0_1_Gi0_1.json"));
        assert!(store.traps_path(&key).ends_with("traps_10001_Gi0_1.json"));
    }

    #[test]
    fn test_samples_append_in_order() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let key = SeriesKey::new("10.0.0.1", "Gi0/1");

        assert_eq!(store.read_samples(&key).unwrap(), None);

        for (secs, value) in [(0, 100), (5, 250)] {
            let sample = Sample {
                timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
                value,
            };
            store.append_sample(&key, &sample).unwrap();
        }

        let samples = store.read_samples(&key).unwrap().unwrap();
        assert_eq!(samples.iter().map(|s| s.value).collect::<Vec<_>>(), vec![100, 250]);
    }

    #[test]
    fn test_traps_and_topology() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let key = SeriesKey::new("10.0.0.1", "Gi0/1");
        assert!(!store.has_traps(&key).unwrap());

        let event = TrapEvent {
            timestamp: Utc::now(),
            trap_type: TrapType::LinkUp,
            vars: BTreeMap::new(),
        };
        store.append_trap(&key, &event).unwrap();
        assert!(store.has_traps(&key).unwrap());

        assert_eq!(store.load_topology().unwrap(), None);
        let snapshot: TopologySnapshot = [TopologyEdge::new("R1", "R2")].into_iter().collect();
        store.save_topology(&snapshot).unwrap();
        assert_eq!(store.load_topology().unwrap(), Some(snapshot));
    }

    #[test]
    fn test_empty_series_file_reads_as_absent_and_accepts_appends() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let key = SeriesKey::new("10.0.0.1", "Gi0/1");
        fs::write(store.samples_path(&key), b"").unwrap();
        fs::write(store.traps_path(&key), b"  \n").unwrap();

        assert_eq!(store.read_samples(&key).unwrap(), None);
        assert_eq!(store.read_traps(&key).unwrap(), None);

        let sample = Sample {
            timestamp: Utc::now(),
            value: 7,
        };
        store.append_sample(&key, &sample).unwrap();
        assert_eq!(store.read_samples(&key).unwrap(), Some(vec![sample]));
    }

    #[test]
    fn test_writes_leave_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let key = SeriesKey::new("10.0.0.1", "Gi0/1");
        for value in 0..3 {
            let sample = Sample {
                timestamp: Utc::now(),
                value,
            };
            store.append_sample(&key, &sample).unwrap();
        }

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("10_0_0_1_Gi0_1.json")]);
    }

    #[test]
    fn test_empty_trap_series_still_counts_as_data() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        let key = SeriesKey::new("10.0.0.1", "Gi0/1");
        fs::write(store.traps_path(&key), b"[]").unwrap();
        assert!(store.has_traps(&key).unwrap());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        fs::write(store.topology_path(), "not json").unwrap();
        assert!(matches!(
            store.load_topology(),
            Err(StorageError::Json { .. })
        ));
    }
}
