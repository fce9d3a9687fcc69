//! Backup subsystem for vaultdb
//!
//! A backup is a byte copy of the persisted database image in the backup
//! directory, named `backup-<timestamp>.db` and recorded in the `backups`
//! catalogue table inside the database itself.
//!
//! # Algorithm
//!
//! 1. Copy the live file to the backup directory and fsync it
//! 2. Validate the copy (exists, at least one page, SQLite header)
//! 3. Record `last_backup_at` and the catalogue row in one transaction
//! 4. Rotate: keep the newest `max_backups`, delete the rest
//!
//! # Important
//!
//! Backup reads the persisted file, never the in-memory instance.
//! A copy that fails validation is deleted and never catalogued.
//! Rotation failures are logged and do not fail the backup.

pub(crate) mod catalogue;
mod errors;
pub(crate) mod files;
mod manager;
mod scheduler;
mod validator;

pub use catalogue::BackupRecord;
pub use errors::{BackupError, BackupErrorCode, BackupResult};
pub use manager::BackupManager;
pub use scheduler::AutoBackupScheduler;
pub use validator::validate_backup_file;
