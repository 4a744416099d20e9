//! Schema migrations for the webtrail SQLite database.
//!
//! Uses a `schema_version` table to track which migrations have been
//! applied. Each migration runs exactly once and is recorded with a
//! timestamp.

use rusqlite::Connection;

/// Current schema version. Bump this when adding a new migration.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Returns the current schema version from the database (0 if the table
/// does not exist yet).
pub fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )
    .unwrap_or(0)
}

/// Runs all pending schema migrations against the provided connection.
///
/// Safe to call on every startup; each migration is recorded in
/// `schema_version` and runs exactly once.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn run_all(conn: &Connection) -> Result<(), rusqlite::Error> {
    // WAL lets analytics reads run concurrently with ingestion writes.
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         CREATE TABLE IF NOT EXISTS schema_version (
             version INTEGER PRIMARY KEY,
             applied_at INTEGER NOT NULL,
             description TEXT NOT NULL
         );",
    )?;

    let current = get_schema_version(conn);

    if current < 1 {
        migration_v1(conn)?;
        record_version(conn, 1, "Initial schema: history items, visit details, categories")?;
    }

    Ok(())
}

fn record_version(conn: &Connection, version: i32, description: &str) -> Result<(), rusqlite::Error> {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
        rusqlite::params![version, now, description],
    )?;
    Ok(())
}

/// V1: the three object stores and their secondary indexes.
///
/// `history_items` is keyed by (url, last_visit_time) — the ingestion dedupe
/// key. `visit_details` rows are immutable once written. `categories` holds
/// at most one row per URL; `top_label` mirrors the highest-confidence label
/// for indexed category queries.
fn migration_v1(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS history_items (
            url TEXT NOT NULL,
            title TEXT NOT NULL,
            last_visit_time INTEGER NOT NULL,
            visit_count INTEGER NOT NULL DEFAULT 1,
            typed_count INTEGER NOT NULL DEFAULT 0,
            domain TEXT NOT NULL DEFAULT '',
            PRIMARY KEY (url, last_visit_time)
        );

        CREATE INDEX IF NOT EXISTS idx_history_items_url ON history_items(url);
        CREATE INDEX IF NOT EXISTS idx_history_items_time ON history_items(last_visit_time);
        CREATE INDEX IF NOT EXISTS idx_history_items_domain ON history_items(domain);

        CREATE TABLE IF NOT EXISTS visit_details (
            visit_id TEXT PRIMARY KEY,
            url TEXT NOT NULL,
            visit_time INTEGER NOT NULL,
            referring_visit_id TEXT,
            transition TEXT NOT NULL DEFAULT 'link'
        );

        CREATE INDEX IF NOT EXISTS idx_visit_details_url ON visit_details(url);
        CREATE INDEX IF NOT EXISTS idx_visit_details_time ON visit_details(visit_time);

        CREATE TABLE IF NOT EXISTS categories (
            url TEXT PRIMARY KEY,
            categories TEXT NOT NULL,
            top_label TEXT NOT NULL,
            last_visit_time INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_categories_label ON categories(top_label);
        CREATE INDEX IF NOT EXISTS idx_categories_time ON categories(last_visit_time);
        ",
    )
}
