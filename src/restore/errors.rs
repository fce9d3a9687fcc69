//! Restore-specific error types
//!
//! All restore errors are FATAL: the operator asked for a specific state
//! and did not get it. Failures before the copy-over leave the live file
//! untouched.

use std::fmt;
use std::path::Path;

use crate::error::{BoxedSource, Severity};
use crate::storage::{ImageDefect, StorageError};

/// Restore error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreErrorCode {
    /// No catalogue entry with the requested id
    NotFound,
    /// The catalogued file no longer exists
    MissingFile,
    /// The catalogued file is not a usable database image
    InvalidBackup,
    /// Copy, rename or reload failed
    Io,
}

impl RestoreErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreErrorCode::NotFound => "VAULT_RESTORE_NOT_FOUND",
            RestoreErrorCode::MissingFile => "VAULT_RESTORE_MISSING_FILE",
            RestoreErrorCode::InvalidBackup => "VAULT_RESTORE_INVALID_BACKUP",
            RestoreErrorCode::Io => "VAULT_RESTORE_IO",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for RestoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Restore error with full context
#[derive(Debug)]
pub struct RestoreError {
    code: RestoreErrorCode,
    message: String,
    source: Option<BoxedSource>,
}

impl RestoreError {
    fn new(code: RestoreErrorCode, message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    pub fn not_found(id: i64) -> Self {
        Self::new(
            RestoreErrorCode::NotFound,
            format!("backup {} not found", id),
            None,
        )
    }

    pub fn missing_file(path: &Path) -> Self {
        Self::new(
            RestoreErrorCode::MissingFile,
            format!("backup file {} does not exist", path.display()),
            None,
        )
    }

    pub fn invalid_backup(path: &Path, defect: ImageDefect) -> Self {
        Self::new(
            RestoreErrorCode::InvalidBackup,
            format!("backup file {} is not a valid database", path.display()),
            Some(Box::new(defect)),
        )
    }

    pub fn io(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::new(RestoreErrorCode::Io, message, source)
    }

    pub fn code(&self) -> RestoreErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Always true
    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl fmt::Display for RestoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for RestoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<StorageError> for RestoreError {
    fn from(err: StorageError) -> Self {
        Self::io("storage failure during restore", Some(Box::new(err)))
    }
}

/// Result type for restore operations
pub type RestoreResult<T> = Result<T, RestoreError>;
