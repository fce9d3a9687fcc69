//! Crate-level error types
//!
//! Every subsystem owns a structured error (`code` + `severity` + message +
//! optional source). `VaultError` aggregates them for callers that drive
//! several subsystems at once, such as the CLI and the auto-backup task.

use std::fmt;

use thiserror::Error;

use crate::backup::BackupError;
use crate::config::ConfigError;
use crate::migration::MigrationError;
use crate::restore::RestoreError;
use crate::storage::StorageError;

/// Severity levels shared by all subsystem errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed, the process may continue
    Error,
    /// The application must not proceed
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Boxed underlying cause carried by subsystem errors
pub type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Any vaultdb error
#[derive(Debug, Error)]
pub enum VaultError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error(transparent)]
    Restore(#[from] RestoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl VaultError {
    /// Returns the severity of the wrapped error
    pub fn severity(&self) -> Severity {
        match self {
            VaultError::Storage(e) => e.severity(),
            VaultError::Migration(e) => e.severity(),
            VaultError::Backup(e) => e.severity(),
            VaultError::Restore(e) => e.severity(),
            VaultError::Config(e) => e.severity(),
        }
    }

    /// Returns the stable error code of the wrapped error
    pub fn code(&self) -> &'static str {
        match self {
            VaultError::Storage(e) => e.code().as_str(),
            VaultError::Migration(e) => e.code().as_str(),
            VaultError::Backup(e) => e.code().as_str(),
            VaultError::Restore(e) => e.code().as_str(),
            VaultError::Config(e) => e.code().as_str(),
        }
    }

    /// Whether startup must stop on this error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// Result type for operations spanning several subsystems
pub type VaultResult<T> = Result<T, VaultError>;
