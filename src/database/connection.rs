//! SQLite connection management for the webtrail store.
//!
//! [`Database`] wraps a `rusqlite::Connection` and runs schema migrations
//! on open, so every consumer sees the full set of object stores.

use rusqlite::Connection;
use std::path::Path;

use super::migrations;

/// Database wrapper owning the SQLite connection.
///
/// Writes for one logical batch go through a single transaction opened on
/// this connection; see `managers::history_store`.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) the database file at `path` and runs migrations.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established
    /// or a migration fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    /// Opens an in-memory database and runs migrations.
    ///
    /// Used by tests; the data is discarded when the value is dropped.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the connection cannot be established
    /// or a migration fails.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> Result<(), rusqlite::Error> {
        migrations::run_all(&self.conn)
    }

    /// Returns the underlying connection for queries and transactions.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
