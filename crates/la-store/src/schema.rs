use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 2;

pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA journal_mode = WAL;")?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;

    // Fresh databases get every column. On a v1 database the CREATEs are
    // no-ops and the ALTER below fills in what is missing.
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS expressions (
            id         TEXT PRIMARY KEY,
            source     TEXT NOT NULL,
            canonical  TEXT NOT NULL,
            value_json TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            owner      TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS eval_cache (
            hash       TEXT PRIMARY KEY,
            source     TEXT NOT NULL,
            value_json TEXT NOT NULL,
            hits       INTEGER NOT NULL DEFAULT 0
        );
        ",
    )?;

    // v1 → v2: owner column
    if conn
        .prepare("SELECT owner FROM expressions LIMIT 0")
        .is_err()
    {
        conn.execute_batch(
            "ALTER TABLE expressions ADD COLUMN owner TEXT NOT NULL DEFAULT '';",
        )?;
        tracing::info!("migrated expressions table: added owner column");
    }

    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_expr_owner ON expressions(owner);
        CREATE INDEX IF NOT EXISTS idx_expr_created ON expressions(created_at);
        ",
    )?;

    conn.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('schema_version', ?1)",
        [SCHEMA_VERSION.to_string()],
    )?;

    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let mut stmt = conn.prepare("SELECT value FROM metadata WHERE key = 'schema_version'")?;
    let version = stmt
        .query_row([], |row| {
            let v: String = row.get(0)?;
            Ok(v.parse::<i64>().unwrap_or(0))
        })
        .ok();
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_creates_tables() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for table in &["metadata", "expressions", "eval_cache"] {
            let count: i64 = conn
                .query_row(&format!("SELECT count(*) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .unwrap();
            assert_eq!(count, if *table == "metadata" { 1 } else { 0 });
        }
    }

    #[test]
    fn test_schema_version_set() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        assert_eq!(get_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_idempotent_initialize() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();
    }

    #[test]
    fn test_busy_timeout_set() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let timeout: i64 = conn
            .query_row("PRAGMA busy_timeout", [], |row| row.get(0))
            .unwrap();
        assert_eq!(timeout, 5000);
    }

    #[test]
    fn test_upgrade_v1_adds_owner() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT NOT NULL);
            INSERT INTO metadata (key, value) VALUES ('schema_version', '1');

            CREATE TABLE expressions (
                id         TEXT PRIMARY KEY,
                source     TEXT NOT NULL,
                canonical  TEXT NOT NULL,
                value_json TEXT NOT NULL,
                created_at INTEGER NOT NULL
            );
            INSERT INTO expressions (id, source, canonical, value_json, created_at)
            VALUES ('e1', '1 + 1', '2', '{\"kind\":\"scalar\",\"value\":2.0}', 0);
            ",
        )
        .unwrap();

        initialize(&conn).unwrap();

        let owner: String = conn
            .query_row("SELECT owner FROM expressions WHERE id = 'e1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(owner, "");
        assert_eq!(get_schema_version(&conn).unwrap(), Some(2));
    }
}
