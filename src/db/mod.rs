//! Database module for the localization tables
//!
//! This module provides SQLite connectivity and the read-only queries behind schema localization

pub mod connection;
pub mod locale_repo;
pub mod schema_repo;

pub use connection::{open_connection, open_read_only};
pub use locale_repo::LocaleRepository;
pub use schema_repo::SchemaRepository;

#[cfg(test)]
pub(crate) mod test_fixtures {
    use rusqlite::Connection;

    pub const SCHEMA_SQL: &str = include_str!("../../tests/fixtures/schema.sql");
    pub const SEED_SQL: &str = include_str!("../../tests/fixtures/seed.sql");

    /// In-memory database with the fixture schema, without rows
    pub fn empty_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        conn
    }

    /// In-memory database with the fixture schema and seed rows
    pub fn seeded_db() -> Connection {
        let conn = empty_db();
        conn.execute_batch(SEED_SQL).unwrap();
        conn
    }
}
