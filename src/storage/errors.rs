//! Storage error types
//!
//! Error codes:
//! - VAULT_STORAGE_INIT_FAILED (FATAL)
//! - VAULT_STORAGE_QUERY_FAILED (ERROR)
//! - VAULT_STORAGE_EXECUTION_FAILED (ERROR)
//! - VAULT_STORAGE_PERSISTENCE_FAILED (ERROR)

use std::fmt;

use rusqlite::types::Value;

use crate::error::{BoxedSource, Severity};

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Engine or image file could not be opened
    InitFailed,
    /// Read-only statement failed
    QueryFailed,
    /// Mutating statement or transaction failed
    ExecutionFailed,
    /// A step of the atomic write protocol failed
    PersistenceFailed,
}

impl StorageErrorCode {
    /// Returns the stable string code
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageErrorCode::InitFailed => "VAULT_STORAGE_INIT_FAILED",
            StorageErrorCode::QueryFailed => "VAULT_STORAGE_QUERY_FAILED",
            StorageErrorCode::ExecutionFailed => "VAULT_STORAGE_EXECUTION_FAILED",
            StorageErrorCode::PersistenceFailed => "VAULT_STORAGE_PERSISTENCE_FAILED",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::InitFailed => Severity::Fatal,
            StorageErrorCode::QueryFailed
            | StorageErrorCode::ExecutionFailed
            | StorageErrorCode::PersistenceFailed => Severity::Error,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Storage error with the failing statement attached when there is one
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    statement: Option<String>,
    params: Option<String>,
    source: Option<BoxedSource>,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self {
            code,
            message: message.into(),
            statement: None,
            params: None,
            source,
        }
    }

    /// Engine could not be opened or the image could not be loaded
    pub fn initialization(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::new(StorageErrorCode::InitFailed, message, source)
    }

    /// Operation attempted on a handle that is not open
    pub fn not_open() -> Self {
        Self::initialization("database is not open", None)
    }

    /// Read-only statement failed
    pub fn query(sql: &str, params: &[Value], source: rusqlite::Error) -> Self {
        Self::new(StorageErrorCode::QueryFailed, source.to_string(), Some(Box::new(source)))
            .with_statement(sql, params)
    }

    /// Statement passed to `query()` would modify the database
    pub fn not_read_only(sql: &str, params: &[Value]) -> Self {
        Self::new(
            StorageErrorCode::QueryFailed,
            "statement is not read-only; use execute()",
            None,
        )
        .with_statement(sql, params)
    }

    /// Mutating statement failed
    pub fn execution(sql: &str, params: &[Value], source: rusqlite::Error) -> Self {
        Self::new(
            StorageErrorCode::ExecutionFailed,
            source.to_string(),
            Some(Box::new(source)),
        )
        .with_statement(sql, params)
    }

    /// A step of the atomic write protocol failed.
    ///
    /// The message stays generic ("could not save database"); the failing
    /// step and cause are in the details.
    pub fn persistence(step: impl Into<String>, source: Option<BoxedSource>) -> Self {
        let mut err = Self::new(
            StorageErrorCode::PersistenceFailed,
            "could not save database",
            source,
        );
        err.params = Some(step.into());
        err
    }

    fn with_statement(mut self, sql: &str, params: &[Value]) -> Self {
        self.statement = Some(sql.to_string());
        self.params = Some(format!("{:?}", params));
        self
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The statement that failed, for query and execution errors
    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    /// Rendered parameters of the failing statement, or the failing save
    /// step for persistence errors
    pub fn details(&self) -> Option<&str> {
        self.params.as_deref()
    }

    /// The underlying engine error, if this error came from SQLite
    pub fn sqlite_error(&self) -> Option<&rusqlite::Error> {
        self.source
            .as_deref()
            .and_then(|e| e.downcast_ref::<rusqlite::Error>())
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)?;
        if let Some(ref statement) = self.statement {
            write!(f, " (statement: {}", statement)?;
            if let Some(ref params) = self.params {
                write!(f, ", params: {}", params)?;
            }
            write!(f, ")")?;
        } else if let Some(ref details) = self.params {
            write!(f, " ({})", details)?;
        }
        if self.code == StorageErrorCode::PersistenceFailed {
            if let Some(ref source) = self.source {
                write!(f, " (caused by: {})", source)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
