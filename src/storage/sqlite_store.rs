use chrono::{DateTime, SecondsFormat, Utc};
use log::{debug, info};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::TelemetryStore;
use super::errors::{Result, StorageError};
use super::schema::create_tables;
use crate::models::{Sample, SeriesKey, TopologyEdge, TopologySnapshot, TrapEvent, TrapType};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let conn = Connection::open(db_path.as_ref())?;
        // WAL is unavailable for in-memory databases
        let _ = conn.pragma_update(None, "journal_mode", "WAL");
        conn.busy_timeout(Duration::from_secs(5))?;
        create_tables(&conn)?;

        info!("SQLite store opened at {}", db_path.as_ref().display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        create_tables(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| StorageError::Corrupt {
            what: "timestamp",
            value: raw,
        })
}

fn parse_trap_type(raw: &str) -> TrapType {
    match raw {
        "linkUp" => TrapType::LinkUp,
        "linkDown" => TrapType::LinkDown,
        _ => TrapType::Unknown,
    }
}

impl TelemetryStore for SqliteStore {
    fn append_sample(&self, key: &SeriesKey, sample: &Sample) -> Result<()> {
        // Counters are unsigned 64-bit; stored bit-for-bit in SQLite's signed INTEGER
        self.conn().execute(
            "INSERT INTO samples (device, interface_name, timestamp, value) VALUES (?1, ?2, ?3, ?4)",
            params![
                key.device,
                key.interface,
                format_timestamp(&sample.timestamp),
                sample.value as i64
            ],
        )?;
        Ok(())
    }

    fn read_samples(&self, key: &SeriesKey) -> Result<Option<Vec<Sample>>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT timestamp, value FROM samples
             WHERE device = ?1 AND interface_name = ?2 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![key.device, key.interface], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if rows.is_empty() {
            return Ok(None);
        }
        rows.into_iter()
            .map(|(timestamp, value)| {
                Ok(Sample {
                    timestamp: parse_timestamp(timestamp)?,
                    value: value as u64,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn append_trap(&self, key: &SeriesKey, event: &TrapEvent) -> Result<()> {
        let vars = serde_json::to_string(&event.vars).map_err(|e| StorageError::Corrupt {
            what: "vars",
            value: e.to_string(),
        })?;
        self.conn().execute(
            "INSERT INTO trap_events (device, interface_name, timestamp, trap_type, vars)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key.device,
                key.interface,
                format_timestamp(&event.timestamp),
                event.trap_type.to_string(),
                vars
            ],
        )?;
        Ok(())
    }

    fn read_traps(&self, key: &SeriesKey) -> Result<Option<Vec<TrapEvent>>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT timestamp, trap_type, vars FROM trap_events
             WHERE device = ?1 AND interface_name = ?2 ORDER BY id",
        )?;
        let rows = stmt
            .query_map(params![key.device, key.interface], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        if rows.is_empty() {
            return Ok(None);
        }
        rows.into_iter()
            .map(|(timestamp, trap_type, vars)| {
                let vars: BTreeMap<String, String> =
                    serde_json::from_str(&vars).map_err(|_| StorageError::Corrupt {
                        what: "vars",
                        value: vars.clone(),
                    })?;
                Ok(TrapEvent {
                    timestamp: parse_timestamp(timestamp)?,
                    trap_type: parse_trap_type(&trap_type),
                    vars,
                })
            })
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    fn has_traps(&self, key: &SeriesKey) -> Result<bool> {
        let found = self
            .conn()
            .query_row(
                "SELECT 1 FROM trap_events WHERE device = ?1 AND interface_name = ?2 LIMIT 1",
                params![key.device, key.interface],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn save_topology(&self, snapshot: &TopologySnapshot) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM topology_edges", [])?;
        for edge in snapshot.iter() {
            let (a, b) = edge.endpoints();
            tx.execute(
                "INSERT INTO topology_edges (a, b) VALUES (?1, ?2)",
                params![a, b],
            )?;
        }
        tx.execute(
            "INSERT OR REPLACE INTO topology_meta (id, saved_at) VALUES (1, ?1)",
            params![format_timestamp(&Utc::now())],
        )?;
        tx.commit()?;
        debug!("Saved topology snapshot (edges={})", snapshot.len());
        Ok(())
    }

    fn load_topology(&self) -> Result<Option<TopologySnapshot>> {
        let conn = self.conn();
        let saved: Option<String> = conn
            .query_row("SELECT saved_at FROM topology_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        if saved.is_none() {
            return Ok(None);
        }

        let mut stmt = conn.prepare("SELECT a, b FROM topology_edges")?;
        let snapshot = stmt
            .query_map([], |row| {
                Ok(TopologyEdge::new(
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                ))
            })?
            .collect::<rusqlite::Result<TopologySnapshot>>()?;
        Ok(Some(snapshot))
    }
}
