//! CLI-specific error types
//!
//! All CLI errors are FATAL: the process exits non-zero.

use std::fmt;
use std::io;

use crate::backup::BackupError;
use crate::config::ConfigError;
use crate::error::VaultError;
use crate::migration::MigrationError;
use crate::restore::RestoreError;
use crate::storage::StorageError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Malformed command-line input
    InvalidArgument,
    /// Destructive command run without `--yes`
    NotConfirmed,
    /// I/O error (stdout, runtime, signals)
    IoError,
    /// A subsystem reported an error
    CommandFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "VAULT_CLI_INVALID_ARGUMENT",
            Self::NotConfirmed => "VAULT_CLI_NOT_CONFIRMED",
            Self::IoError => "VAULT_CLI_IO_ERROR",
            Self::CommandFailed => "VAULT_CLI_COMMAND_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidArgument, msg)
    }

    pub fn not_confirmed(command: &str) -> Self {
        Self::new(
            CliErrorCode::NotConfirmed,
            format!("'{}' deletes data; pass --yes to confirm", command),
        )
    }

    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::io_error(format!("JSON error: {}", e))
    }
}

impl From<VaultError> for CliError {
    fn from(e: VaultError) -> Self {
        Self::new(CliErrorCode::CommandFailed, e.to_string())
    }
}

macro_rules! via_vault_error {
    ($($source:ty),*) => {
        $(
            impl From<$source> for CliError {
                fn from(e: $source) -> Self {
                    VaultError::from(e).into()
                }
            }
        )*
    };
}

via_vault_error!(StorageError, MigrationError, BackupError, RestoreError, ConfigError);

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
