//! The `backups` table
//!
//! One row per snapshot file. Rows are inserted only after the file passed
//! validation, and removed on rotation, deletion or when the file is found
//! missing.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::Serialize;

use crate::storage::{Database, Row, Statement, StorageResult};

pub const BACKUPS_TABLE: &str = "backups";

const BACKUPS_TABLE_DDL: &str = "CREATE TABLE IF NOT EXISTS backups (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    filepath TEXT NOT NULL,
    size INTEGER NOT NULL,
    created_at TEXT NOT NULL
)";

const COLUMNS: &str = "id, filename, filepath, size, created_at";

/// One catalogued snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupRecord {
    pub id: i64,
    pub filename: String,
    pub filepath: PathBuf,
    pub size: u64,
    /// RFC 3339, UTC, millisecond precision
    pub created_at: String,
}

impl BackupRecord {
    fn from_row(row: &Row) -> Self {
        Self {
            id: row.get_i64("id").unwrap_or_default(),
            filename: row.get_str("filename").unwrap_or_default().to_string(),
            filepath: PathBuf::from(row.get_str("filepath").unwrap_or_default()),
            size: row.get_i64("size").unwrap_or_default().max(0) as u64,
            created_at: row.get_str("created_at").unwrap_or_default().to_string(),
        }
    }

    /// Creation time, if the stored timestamp parses
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.created_at)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Every record, newest first
pub fn records(db: &Database) -> StorageResult<Vec<BackupRecord>> {
    if !db.table_exists(BACKUPS_TABLE)? {
        return Ok(Vec::new());
    }
    let sql = format!(
        "SELECT {} FROM backups ORDER BY created_at DESC, id DESC",
        COLUMNS
    );
    Ok(db.query(&sql, &[])?.iter().map(BackupRecord::from_row).collect())
}

pub fn find(db: &Database, id: i64) -> StorageResult<Option<BackupRecord>> {
    if !db.table_exists(BACKUPS_TABLE)? {
        return Ok(None);
    }
    let sql = format!("SELECT {} FROM backups WHERE id = ?1", COLUMNS);
    Ok(db
        .query(&sql, &[Value::Integer(id)])?
        .first()
        .map(BackupRecord::from_row))
}

/// Statements inserting a new record. The last one returns the inserted
/// row.
pub fn insert_statements(
    filename: &str,
    filepath: &str,
    size: u64,
    created_at: &str,
) -> Vec<Statement> {
    vec![
        Statement::new(BACKUPS_TABLE_DDL),
        Statement::new(format!(
            "INSERT INTO backups (filename, filepath, size, created_at)
             VALUES (?1, ?2, ?3, ?4) RETURNING {}",
            COLUMNS
        ))
        .with_params(vec![
            Value::Text(filename.to_string()),
            Value::Text(filepath.to_string()),
            Value::Integer(size as i64),
            Value::Text(created_at.to_string()),
        ]),
    ]
}

/// Parses the rows returned by the last of `insert_statements`
pub fn inserted(rows: &[Row]) -> Option<BackupRecord> {
    rows.first().map(BackupRecord::from_row)
}

/// Deletes the records with these ids in one transaction
pub fn remove(db: &mut Database, ids: &[i64]) -> StorageResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let statements: Vec<Statement> = ids
        .iter()
        .map(|id| {
            Statement::new("DELETE FROM backups WHERE id = ?1")
                .with_params(vec![Value::Integer(*id)])
        })
        .collect();
    db.transaction(&statements)?;
    Ok(())
}

/// Inserts records with their original ids, keeping rows already present.
/// Returns how many statements ran.
pub fn reinsert(db: &mut Database, records: &[BackupRecord]) -> StorageResult<usize> {
    if records.is_empty() {
        return Ok(0);
    }
    let mut statements = vec![Statement::new(BACKUPS_TABLE_DDL)];
    statements.extend(records.iter().map(|r| {
        Statement::new(format!(
            "INSERT OR IGNORE INTO backups ({}) VALUES (?1, ?2, ?3, ?4, ?5)",
            COLUMNS
        ))
        .with_params(vec![
            Value::Integer(r.id),
            Value::Text(r.filename.clone()),
            Value::Text(r.filepath.to_string_lossy().into_owned()),
            Value::Integer(r.size as i64),
            Value::Text(r.created_at.clone()),
        ])
    }));
    db.transaction(&statements)?;
    Ok(records.len())
}
