//! Bookkeeping tables owned by the storage layer

use rusqlite::{Connection, OptionalExtension};

/// Name of the table recording applied schema-change scripts
pub const MIGRATIONS_TABLE: &str = "migrations";

pub const MIGRATIONS_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL UNIQUE,
    checksum TEXT NOT NULL,
    applied_at TEXT NOT NULL
)";

/// Whether a table with this name exists in the main schema
pub fn table_exists(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [name],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

/// Creates the `migrations` table if missing. Returns true if it was created.
pub fn ensure_migrations_table(conn: &Connection) -> rusqlite::Result<bool> {
    if table_exists(conn, MIGRATIONS_TABLE)? {
        return Ok(false);
    }
    conn.execute_batch(MIGRATIONS_TABLE_DDL)?;
    Ok(true)
}
