//! Backup-specific error types
//!
//! All backup errors are ERROR severity, never FATAL: a failed backup does
//! not touch the live database.

use std::fmt;
use std::io;
use std::path::Path;

use crate::error::{BoxedSource, Severity};
use crate::storage::StorageError;

/// Backup error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupErrorCode {
    /// Copy is missing, too small or not a database; it was discarded
    ValidationFailed,
    /// File system failure in the backup directory
    Io,
    /// Catalogue read/write failure or unknown backup id
    Catalogue,
}

impl BackupErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupErrorCode::ValidationFailed => "VAULT_BACKUP_VALIDATION_FAILED",
            BackupErrorCode::Io => "VAULT_BACKUP_IO",
            BackupErrorCode::Catalogue => "VAULT_BACKUP_CATALOGUE",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for BackupErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Backup error with full context
#[derive(Debug)]
pub struct BackupError {
    code: BackupErrorCode,
    message: String,
    source: Option<BoxedSource>,
}

impl BackupError {
    fn new(code: BackupErrorCode, message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self {
            code,
            message: message.into(),
            source,
        }
    }

    /// The copy failed validation
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(BackupErrorCode::ValidationFailed, message, None)
    }

    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self::new(BackupErrorCode::Io, message, Some(Box::new(source)))
    }

    pub fn io_at_path(path: &Path, source: io::Error) -> Self {
        Self::io(format!("I/O error at {}", path.display()), source)
    }

    pub fn catalogue(message: impl Into<String>) -> Self {
        Self::new(BackupErrorCode::Catalogue, message, None)
    }

    /// No catalogue entry with this id
    pub fn unknown_backup(id: i64) -> Self {
        Self::new(
            BackupErrorCode::Catalogue,
            format!("backup {} not found", id),
            None,
        )
    }

    pub fn code(&self) -> BackupErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Backup errors are never fatal
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for BackupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for BackupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<StorageError> for BackupError {
    fn from(err: StorageError) -> Self {
        Self::new(
            BackupErrorCode::Catalogue,
            "catalogue operation failed",
            Some(Box::new(err)),
        )
    }
}

/// Result type for backup operations
pub type BackupResult<T> = Result<T, BackupError>;
