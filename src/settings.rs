//! Persisted auto-backup settings
//!
//! Stored as key/value rows in the `settings` table, which is created on
//! first write. Reading before any write yields the defaults.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Value;

use crate::config::ConfigError;
use crate::error::VaultResult;
use crate::storage::{Database, Statement};

pub const SETTINGS_TABLE: &str = "settings";

const SETTINGS_TABLE_DDL: &str =
    "CREATE TABLE IF NOT EXISTS settings (key TEXT PRIMARY KEY, value TEXT NOT NULL)";

const UPSERT: &str = "INSERT INTO settings (key, value) VALUES (?1, ?2)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value";

const KEY_ENABLED: &str = "auto_backup_enabled";
const KEY_INTERVAL_HOURS: &str = "auto_backup_interval_hours";
const KEY_LAST_BACKUP_AT: &str = "last_backup_at";

pub const DEFAULT_INTERVAL_HOURS: f64 = 24.0;

/// Auto-backup schedule
#[derive(Debug, Clone, PartialEq)]
pub struct AutoBackupConfig {
    pub enabled: bool,
    pub interval_hours: f64,
    pub last_backup_at: Option<DateTime<Utc>>,
}

impl Default for AutoBackupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_hours: DEFAULT_INTERVAL_HOURS,
            last_backup_at: None,
        }
    }
}

impl AutoBackupConfig {
    pub fn interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.interval_hours * 3600.0).unwrap_or(Duration::MAX)
    }

    /// True when no backup was ever recorded or the last one is at least
    /// one interval old
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_backup_at {
            None => true,
            Some(last) => match (now - last).to_std() {
                Ok(elapsed) => elapsed >= self.interval(),
                // last backup in the future: clock moved backwards
                Err(_) => false,
            },
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.interval_hours.is_finite() || self.interval_hours <= 0.0 {
            return Err(ConfigError::invalid(format!(
                "auto_backup_interval_hours must be a positive number, got {}",
                self.interval_hours
            )));
        }
        Ok(())
    }
}

/// Reads the auto-backup settings; missing or unparsable values fall back
/// to the defaults
pub fn load_auto_backup_config(db: &Database) -> VaultResult<AutoBackupConfig> {
    let mut config = AutoBackupConfig::default();
    if !db.table_exists(SETTINGS_TABLE)? {
        return Ok(config);
    }

    for row in db.query("SELECT key, value FROM settings", &[])? {
        let (Some(key), Some(value)) = (row.get_str("key"), row.get_str("value")) else {
            continue;
        };
        match key {
            KEY_ENABLED => config.enabled = matches!(value, "true" | "1"),
            KEY_INTERVAL_HOURS => {
                if let Ok(hours) = value.parse::<f64>() {
                    if hours.is_finite() && hours > 0.0 {
                        config.interval_hours = hours;
                    }
                }
            }
            KEY_LAST_BACKUP_AT => {
                config.last_backup_at = DateTime::parse_from_rfc3339(value)
                    .ok()
                    .map(|t| t.with_timezone(&Utc));
            }
            _ => {}
        }
    }

    Ok(config)
}

/// Writes all three settings in one transaction
pub fn save_auto_backup_config(db: &mut Database, config: &AutoBackupConfig) -> VaultResult<()> {
    config.validate()?;

    let mut statements = vec![
        Statement::new(SETTINGS_TABLE_DDL),
        upsert(KEY_ENABLED, config.enabled.to_string()),
        upsert(KEY_INTERVAL_HOURS, config.interval_hours.to_string()),
    ];
    match config.last_backup_at {
        Some(at) => statements.push(upsert(KEY_LAST_BACKUP_AT, format_time(at))),
        None => statements.push(
            Statement::new("DELETE FROM settings WHERE key = ?1")
                .with_params(vec![Value::Text(KEY_LAST_BACKUP_AT.to_string())]),
        ),
    }

    db.transaction(&statements)?;
    Ok(())
}

/// Records the time of the latest successful backup
pub fn record_last_backup(db: &mut Database, at: DateTime<Utc>) -> VaultResult<()> {
    db.transaction(&last_backup_statements(at))?;
    Ok(())
}

/// Statements recording `at` as the latest backup, for callers that fold
/// the update into their own transaction
pub(crate) fn last_backup_statements(at: DateTime<Utc>) -> Vec<Statement> {
    vec![
        Statement::new(SETTINGS_TABLE_DDL),
        upsert(KEY_LAST_BACKUP_AT, format_time(at)),
    ]
}

fn upsert(key: &str, value: String) -> Statement {
    Statement::new(UPSERT).with_params(vec![Value::Text(key.to_string()), Value::Text(value)])
}

fn format_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
