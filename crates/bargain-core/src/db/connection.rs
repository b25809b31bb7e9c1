//! Database connection management

use crate::error::Result;
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

use super::migrations;

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database wrapper for `SQLite` connections
///
/// Opening runs migrations automatically. Connections are not `Sync`;
/// concurrent actors each open their own `Database` against the same path
/// and rely on WAL plus the busy timeout for write serialization.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path, creating it if it doesn't exist
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        configure(&conn)?;
        migrations::run(&conn)?;
        Ok(Self { conn })
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

/// Configure `SQLite` for concurrent access
fn configure(conn: &Connection) -> Result<()> {
    // WAL mode returns a row; in-memory databases stay in "memory" mode
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(())).ok();
    conn.pragma_update(None, "synchronous", "NORMAL").ok();
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory().unwrap();
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM negotiations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_creates_file_and_reopens() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("bargain.db");

        {
            let db = Database::open(&path).unwrap();
            db.connection()
                .execute("INSERT INTO items (id, price) VALUES ('item-1', 500)", [])
                .unwrap();
        }

        let db = Database::open(&path).unwrap();
        let price: i64 = db
            .connection()
            .query_row("SELECT price FROM items WHERE id = 'item-1'", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(price, 500);
    }
}
