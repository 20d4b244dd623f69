use rusqlite::Connection;

pub fn create_tables(conn: &Connection) -> rusqlite::Result<()> {
    // Counter samples, one row per successful poll
    conn.execute(
        "CREATE TABLE IF NOT EXISTS samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device TEXT NOT NULL,
            interface_name TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            value INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS trap_events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device TEXT NOT NULL,
            interface_name TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            trap_type TEXT NOT NULL,
            vars TEXT NOT NULL DEFAULT '{}'
        )",
        [],
    )?;

    // Latest snapshot only; replaced wholesale on save
    conn.execute(
        "CREATE TABLE IF NOT EXISTS topology_edges (
            a TEXT NOT NULL,
            b TEXT NOT NULL,
            PRIMARY KEY (a, b)
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS topology_meta (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            saved_at TEXT NOT NULL
        )",
        [],
    )?;

    create_indexes(conn)
}

fn create_indexes(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_samples_series
         ON samples(device, interface_name, id)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_trap_events_series
         ON trap_events(device, interface_name, id)",
        [],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_tables() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        let table_count: i32 = conn
            .prepare("SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_row([], |row| row.get(0))
            .unwrap();
        assert_eq!(table_count, 4);

        // Idempotent
        create_tables(&conn).unwrap();
    }

    #[test]
    fn test_indexes_created() {
        let conn = Connection::open_in_memory().unwrap();
        create_tables(&conn).unwrap();

        let index_count: i32 = conn
            .prepare("SELECT COUNT(*) FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")
            .unwrap()
            .query_row([], |row| row.get(0))
            .unwrap();
        assert_eq!(index_count, 2);
    }
}
