use rusqlite::Connection;
use schema_localization::db::open_connection;
use std::path::PathBuf;
use tempfile::TempDir;

pub const SCHEMA_SQL: &str = include_str!("../fixtures/schema.sql");
pub const SEED_SQL: &str = include_str!("../fixtures/seed.sql");

/// On-disk database with the fixture schema and seed rows.
///
/// The `TempDir` must be kept alive for as long as the file is used.
pub fn seeded_database() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("specify.db");

    let conn: Connection = open_connection(&path).unwrap();
    conn.execute_batch(SCHEMA_SQL).unwrap();
    conn.execute_batch(SEED_SQL).unwrap();

    (temp_dir, path)
}
