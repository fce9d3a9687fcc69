//! Configuration file
//!
//! ```json
//! {
//!   "database_path": "/var/lib/app/app.db",
//!   "migrations_dir": "./migrations",
//!   "backup_dir": "./backups",
//!   "max_backups": 10,
//!   "startup_check_delay_secs": 30
//! }
//! ```
//!
//! Only `database_path` is required. Relative paths are anchored at the
//! directory holding the configuration file. An invalid configuration is
//! FATAL.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::Severity;
use crate::observability::{log_event_with_fields, Event};

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Durable image file (required)
    pub database_path: PathBuf,

    /// Directory of `.sql` schema-change scripts
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,

    /// Directory holding backup snapshots
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Snapshots kept by rotation (> 0)
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Delay before the scheduler's one-shot catch-up check
    #[serde(default = "default_startup_check_delay_secs")]
    pub startup_check_delay_secs: u64,
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("./migrations")
}
fn default_backup_dir() -> PathBuf {
    PathBuf::from("./backups")
}
fn default_max_backups() -> usize {
    10
}
fn default_startup_check_delay_secs() -> u64 {
    30
}

impl VaultConfig {
    /// Defaults for everything except the database path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            migrations_dir: default_migrations_dir(),
            backup_dir: default_backup_dir(),
            max_backups: default_max_backups(),
            startup_check_delay_secs: default_startup_check_delay_secs(),
        }
    }

    /// Reads, parses and validates a JSON configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::invalid(format!("failed to read {}: {}", path.display(), e))
        })?;

        let mut config: VaultConfig = serde_json::from_str(&content)
            .map_err(|e| ConfigError::invalid(format!("invalid config JSON: {}", e)))?;

        config.validate()?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }

        let shown = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", &shown)]);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("database_path must not be empty"));
        }
        if self.max_backups == 0 {
            return Err(ConfigError::invalid("max_backups must be > 0"));
        }
        if self.backup_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid("backup_dir must not be empty"));
        }
        Ok(())
    }

    /// Anchors every relative path at `base`
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for path in [
            &mut self.database_path,
            &mut self.migrations_dir,
            &mut self.backup_dir,
        ] {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
    }

    pub fn startup_check_delay(&self) -> Duration {
        Duration::from_secs(self.startup_check_delay_secs)
    }
}

/// Configuration error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    Invalid,
}

impl ConfigErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigErrorCode::Invalid => "VAULT_CONFIG_INVALID",
        }
    }
}

/// Configuration error. Always FATAL.
#[derive(Debug)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            code: ConfigErrorCode::Invalid,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn severity(&self) -> Severity {
        Severity::Fatal
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.as_str(), self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("vaultdb.json");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_defaults_applied() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"database_path": "/tmp/app.db"}"#);

        let config = VaultConfig::load(&path).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/app.db"));
        assert_eq!(config.backup_dir, dir.path().join("./backups"));
        assert_eq!(config.max_backups, 10);
        assert_eq!(config.startup_check_delay(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_database_path_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"backup_dir": "/tmp/b"}"#);

        let err = VaultConfig::load(&path).unwrap_err();
        assert_eq!(err.code().as_str(), "VAULT_CONFIG_INVALID");
        assert!(err.message().contains("database_path"));
    }

    #[test]
    fn test_zero_retention_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, r#"{"database_path": "a.db", "max_backups": 0}"#);

        let err = VaultConfig::load(&path).unwrap_err();
        assert!(err.to_string().contains("max_backups must be > 0"));
        assert_eq!(err.severity(), Severity::Fatal);
    }

    #[test]
    fn test_missing_file_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(VaultConfig::load(&dir.path().join("absent.json")).is_err());
    }
}
