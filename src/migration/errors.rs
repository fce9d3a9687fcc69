//! Migration error types
//!
//! Every migration error is FATAL: the application must not start on a
//! partially upgraded schema.

use std::fmt;

use crate::error::{BoxedSource, Severity};
use crate::storage::StorageError;

/// Migration error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationErrorCode {
    /// A script could not be applied
    Failed,
    /// The migrations directory or a script file could not be read
    Io,
}

impl MigrationErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationErrorCode::Failed => "VAULT_MIGRATION_FAILED",
            MigrationErrorCode::Io => "VAULT_MIGRATION_IO",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for MigrationErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Migration error with the script (and statement) that failed
#[derive(Debug)]
pub struct MigrationError {
    code: MigrationErrorCode,
    message: String,
    script: Option<String>,
    statement: Option<String>,
    source: Option<BoxedSource>,
}

impl MigrationError {
    fn new(code: MigrationErrorCode, message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self {
            code,
            message: message.into(),
            script: None,
            statement: None,
            source,
        }
    }

    /// Reading scripts from disk failed
    pub fn io(message: impl Into<String>, source: Option<BoxedSource>) -> Self {
        Self::new(MigrationErrorCode::Io, message, source)
    }

    /// Generic migration failure
    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(MigrationErrorCode::Failed, message, None)
    }

    /// A statement of `script` failed and was not an "already exists" case
    pub fn statement_failed(script: &str, err: StorageError) -> Self {
        let statement = err.statement().map(str::to_string);
        let mut e = Self::new(
            MigrationErrorCode::Failed,
            format!("migration {} failed", script),
            Some(Box::new(err)),
        );
        e.script = Some(script.to_string());
        e.statement = statement;
        e
    }

    pub fn code(&self) -> MigrationErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Filename of the failing script
    pub fn script(&self) -> Option<&str> {
        self.script.as_deref()
    }

    /// The statement that failed
    pub fn statement(&self) -> Option<&str> {
        self.statement.as_deref()
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Always true
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code, self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for MigrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<StorageError> for MigrationError {
    fn from(err: StorageError) -> Self {
        Self::new(
            MigrationErrorCode::Failed,
            "storage failure during migration",
            Some(Box::new(err)),
        )
    }
}

pub type MigrationResult<T> = Result<T, MigrationError>;
