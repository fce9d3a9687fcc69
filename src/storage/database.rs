//! The storage handle
//!
//! `Database` owns the live SQLite instance (in memory) and the writer that
//! persists it. Every successful mutation is followed by a synchronous save,
//! so the durable image always reflects the last successful `execute()`,
//! `transaction()` or `run_in_transaction()`.
//!
//! ```text
//! Uninitialized --initialize--> Open --close--> Closed
//!                                 ^  |
//!                                 +--+ reload
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::backup::Progress;
use rusqlite::types::Value;
use rusqlite::{Connection, DatabaseName, TransactionBehavior};

use super::errors::{StorageError, StorageResult};
use super::image::verify_image;
use super::row::{is_read_only, run_statement, ExecuteOutcome, Row, Statement};
use super::schema::{ensure_migrations_table, table_exists};
use super::writer::{image_size, ImageWriter, SaveReport};
use crate::observability::{log_event_with_fields, Event};

/// Lifecycle state of a `Database`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbState {
    Uninitialized,
    Open,
    Closed,
}

/// Handle to one embedded database persisted as a single image file
pub struct Database {
    writer: ImageWriter,
    conn: Option<Connection>,
    state: DbState,
}

impl Database {
    /// Creates an uninitialized handle for the image at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: ImageWriter::new(path),
            conn: None,
            state: DbState::Uninitialized,
        }
    }

    /// Creates and initializes a handle
    pub fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let mut db = Self::new(path);
        db.initialize()?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        self.writer.path()
    }

    pub fn state(&self) -> DbState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DbState::Open
    }

    /// Opens the live instance.
    ///
    /// Loads the image if the file exists, otherwise starts empty and writes
    /// the first image. Creates the `migrations` table when absent and
    /// removes a temp image left by an interrupted save. No-op on an open
    /// handle.
    pub fn initialize(&mut self) -> StorageResult<()> {
        match self.state {
            DbState::Open => return Ok(()),
            DbState::Closed => {
                return Err(StorageError::initialization("database is closed", None))
            }
            DbState::Uninitialized => {}
        }

        match self.load() {
            Ok(conn) => {
                self.conn = Some(conn);
                self.state = DbState::Open;
                let path = self.path().display().to_string();
                log_event_with_fields(Event::DbOpen, &[("path", &path)]);
                Ok(())
            }
            Err(err) => {
                let path = self.path().display().to_string();
                let reason = err.to_string();
                log_event_with_fields(
                    Event::DbOpenFailed,
                    &[("path", &path), ("reason", &reason)],
                );
                Err(err)
            }
        }
    }

    fn load(&self) -> StorageResult<Connection> {
        let removed = self.writer.remove_stale_temp().map_err(|e| {
            StorageError::initialization("could not remove stale temp image", Some(Box::new(e)))
        })?;
        if removed {
            let temp = self.writer.temp_path().display().to_string();
            log_event_with_fields(Event::DbStaleTempRemoved, &[("path", &temp)]);
        }

        let mut conn = Connection::open_in_memory().map_err(|e| {
            StorageError::initialization("could not open engine", Some(Box::new(e)))
        })?;

        let mut needs_save = true;
        if self.path().exists() {
            verify_image(self.path()).map_err(|e| {
                StorageError::initialization("image file is not a database", Some(Box::new(e)))
            })?;
            conn.restore(DatabaseName::Main, self.path(), None::<fn(Progress)>)
                .map_err(|e| {
                    StorageError::initialization("could not load image", Some(Box::new(e)))
                })?;
            needs_save = false;
        } else if let Some(parent) = self.path().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    StorageError::initialization(
                        "could not create database directory",
                        Some(Box::new(e)),
                    )
                })?;
            }
        }

        let created = ensure_migrations_table(&conn).map_err(|e| {
            StorageError::initialization("could not create migrations table", Some(Box::new(e)))
        })?;

        if needs_save || created {
            self.writer.write(&conn).map_err(|e| {
                StorageError::initialization("could not write initial image", Some(Box::new(e)))
            })?;
        }

        Ok(conn)
    }

    fn conn(&self) -> StorageResult<&Connection> {
        self.conn.as_ref().ok_or_else(StorageError::not_open)
    }

    fn conn_mut(&mut self) -> StorageResult<&mut Connection> {
        self.conn.as_mut().ok_or_else(StorageError::not_open)
    }

    /// Runs a read-only statement. Never saves.
    pub fn query(&self, sql: &str, params: &[Value]) -> StorageResult<Vec<Row>> {
        query_on(self.conn()?, sql, params)
    }

    /// Runs one mutating statement, then saves.
    ///
    /// On failure nothing is saved; SQLite statement atomicity leaves the
    /// live instance as it was.
    pub fn execute(&mut self, sql: &str, params: &[Value]) -> StorageResult<ExecuteOutcome> {
        let outcome = execute_on(self.conn()?, sql, params)?;
        self.save()?;
        Ok(outcome)
    }

    /// Runs the statements in one `BEGIN IMMEDIATE` transaction and saves
    /// once after commit. Returns the rows of the last statement.
    pub fn transaction(&mut self, statements: &[Statement]) -> StorageResult<Vec<Row>> {
        self.run_in_transaction(|tx| {
            let mut rows = Vec::new();
            for statement in statements {
                rows = tx.run(statement)?;
            }
            Ok(rows)
        })
    }

    /// Runs `f` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// An `Err` from `f` rolls back and is returned unchanged. On `Ok` the
    /// transaction commits and the image is saved once.
    pub fn run_in_transaction<T, E, F>(&mut self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&TxContext<'_>) -> Result<T, E>,
    {
        let conn = self.conn_mut()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| StorageError::execution("BEGIN IMMEDIATE", &[], e))?;

        // Dropping `tx` on the error path rolls back
        let value = f(&TxContext { conn: &tx })?;

        tx.commit()
            .map_err(|e| StorageError::execution("COMMIT", &[], e))?;
        self.save()?;
        Ok(value)
    }

    /// Persists the live instance through the atomic write protocol.
    ///
    /// A failed save keeps the live instance, so a retry can succeed.
    pub fn save(&self) -> StorageResult<SaveReport> {
        let conn = self.conn()?;
        match self.writer.write(conn) {
            Ok(report) => {
                let bytes = report.bytes.to_string();
                log_event_with_fields(Event::DbSave, &[("bytes", &bytes)]);
                Ok(report)
            }
            Err(err) => {
                let step = err.details().unwrap_or("unknown").to_string();
                let reason = err.to_string();
                log_event_with_fields(
                    Event::DbSaveFailed,
                    &[("step", &step), ("reason", &reason)],
                );
                Err(err)
            }
        }
    }

    /// Whether a table with this name exists
    pub fn table_exists(&self, name: &str) -> StorageResult<bool> {
        let sql = "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1";
        table_exists(self.conn()?, name)
            .map_err(|e| StorageError::query(sql, &[Value::Text(name.to_string())], e))
    }

    /// Byte size of the live image
    pub fn image_bytes(&self) -> StorageResult<u64> {
        image_size(self.conn()?)
    }

    /// Drops the live instance without saving and loads the image from disk
    /// again. Used after the file was replaced underneath the handle.
    pub fn reload(&mut self) -> StorageResult<()> {
        if !self.is_open() {
            return Err(StorageError::not_open());
        }
        self.conn = None;
        self.state = DbState::Uninitialized;
        self.initialize()?;

        let path = self.path().display().to_string();
        log_event_with_fields(Event::DbReload, &[("path", &path)]);
        Ok(())
    }

    /// Saves and releases the live instance. Terminal.
    ///
    /// If the final save fails the handle stays open.
    pub fn close(&mut self) -> StorageResult<()> {
        if self.is_open() {
            self.save()?;
            self.conn = None;
            let path = self.path().display().to_string();
            log_event_with_fields(Event::DbClose, &[("path", &path)]);
        }
        self.state = DbState::Closed;
        Ok(())
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.path())
            .field("state", &self.state)
            .finish()
    }
}

/// Statement access inside `Database::run_in_transaction`
pub struct TxContext<'a> {
    conn: &'a Connection,
}

impl TxContext<'_> {
    /// Runs one statement without saving
    pub fn execute(&self, sql: &str, params: &[Value]) -> StorageResult<ExecuteOutcome> {
        execute_on(self.conn, sql, params)
    }

    /// Runs one read-only statement
    pub fn query(&self, sql: &str, params: &[Value]) -> StorageResult<Vec<Row>> {
        query_on(self.conn, sql, params)
    }

    /// Runs any statement and returns the rows it produced, if any
    pub fn run(&self, statement: &Statement) -> StorageResult<Vec<Row>> {
        run_statement(self.conn, &statement.sql, &statement.params)
            .map(|out| out.rows)
            .map_err(|e| StorageError::execution(&statement.sql, &statement.params, e))
    }
}

fn query_on(conn: &Connection, sql: &str, params: &[Value]) -> StorageResult<Vec<Row>> {
    let read_only = is_read_only(conn, sql).map_err(|e| StorageError::query(sql, params, e))?;
    if !read_only {
        return Err(StorageError::not_read_only(sql, params));
    }
    run_statement(conn, sql, params)
        .map(|out| out.rows)
        .map_err(|e| StorageError::query(sql, params, e))
}

fn execute_on(conn: &Connection, sql: &str, params: &[Value]) -> StorageResult<ExecuteOutcome> {
    let out =
        run_statement(conn, sql, params).map_err(|e| StorageError::execution(sql, params, e))?;
    Ok(ExecuteOutcome {
        changes: out.changes,
        last_insert_rowid: conn.last_insert_rowid(),
    })
}
