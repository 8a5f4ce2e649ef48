//! Database connection management using rusqlite

use crate::error::{LocalizationError, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Open a read-write connection (used for migrations)
pub fn open_connection(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path).map_err(|e| {
        LocalizationError::Database(format!("Failed to open database {}: {}", path.display(), e))
    })?;
    configure(&conn)?;
    Ok(conn)
}

/// Open a read-only connection for localization lookups
pub fn open_read_only(path: &Path) -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags).map_err(|e| {
        LocalizationError::Database(format!("Failed to open database {}: {}", path.display(), e))
    })?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)
        .map_err(|e| LocalizationError::Database(format!("Failed to set busy timeout: {}", e)))?;
    conn.pragma_update(None, "foreign_keys", true)
        .map_err(|e| LocalizationError::Database(format!("Failed to enable foreign keys: {}", e)))?;
    Ok(())
}
