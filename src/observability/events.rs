//! Observable events
//!
//! Every lifecycle transition of the storage handle, the migrator and the
//! backup subsystem has an explicit, typed event.

use std::fmt;

/// Observable events in vaultdb
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Storage lifecycle
    /// Live instance opened from disk or created empty
    DbOpen,
    /// Stale temp image removed during initialize
    DbStaleTempRemoved,
    /// Image persisted through the atomic write protocol
    DbSave,
    /// Atomic write protocol failed
    DbSaveFailed,
    /// Live instance re-initialized from disk
    DbReload,
    /// Live instance saved and released
    DbClose,
    /// Database failed to open (FATAL)
    DbOpenFailed,

    // Migrations
    /// Migration run begins
    MigrationRunBegin,
    /// One script applied and persisted
    MigrationApplied,
    /// Statement skipped because its object already exists
    MigrationStatementSkipped,
    /// Migration run complete
    MigrationRunComplete,
    /// Migration aborted (FATAL)
    MigrationFailed,

    // Backups
    /// Backup copy failed validation
    BackupInvalid,
    /// Old backup removed by rotation
    BackupRotated,
    /// Rotation could not remove a backup
    BackupRotationFailed,
    /// Catalogue entry pruned because its file is gone
    BackupPruned,
    /// Backup deleted on request
    BackupDeleted,

    // Restore
    /// Emergency copy of the live file written
    RestoreEmergencyCopy,
    /// Restore complete and live instance reloaded
    RestoreComplete,
    /// Restore aborted
    RestoreFailed,

    // Maintenance
    /// Business tables emptied
    DataCleared,

    // Scheduler
    /// Auto-backup scheduler started
    SchedulerStarted,
    /// Scheduled backup skipped (disabled or not yet due)
    SchedulerSkipped,
    /// Scheduled backup failed
    SchedulerBackupFailed,
    /// Scheduler stopped
    SchedulerStopped,
    /// Scheduler task panicked or was cancelled
    SchedulerAborted,

    // Configuration
    /// Configuration loaded
    ConfigLoaded,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::DbOpen => "DB_OPEN",
            Event::DbStaleTempRemoved => "DB_STALE_TEMP_REMOVED",
            Event::DbSave => "DB_SAVE",
            Event::DbSaveFailed => "DB_SAVE_FAILED",
            Event::DbReload => "DB_RELOAD",
            Event::DbClose => "DB_CLOSE",
            Event::DbOpenFailed => "DB_OPEN_FAILED",

            Event::MigrationRunBegin => "MIGRATION_RUN_BEGIN",
            Event::MigrationApplied => "MIGRATION_APPLIED",
            Event::MigrationStatementSkipped => "MIGRATION_STATEMENT_SKIPPED",
            Event::MigrationRunComplete => "MIGRATION_RUN_COMPLETE",
            Event::MigrationFailed => "MIGRATION_FAILED",

            Event::BackupInvalid => "BACKUP_INVALID",
            Event::BackupRotated => "BACKUP_ROTATED",
            Event::BackupRotationFailed => "BACKUP_ROTATION_FAILED",
            Event::BackupPruned => "BACKUP_PRUNED",
            Event::BackupDeleted => "BACKUP_DELETED",

            Event::RestoreEmergencyCopy => "RESTORE_EMERGENCY_COPY",
            Event::RestoreComplete => "RESTORE_COMPLETE",
            Event::RestoreFailed => "RESTORE_FAILED",

            Event::DataCleared => "DATA_CLEARED",

            Event::SchedulerStarted => "SCHEDULER_STARTED",
            Event::SchedulerSkipped => "SCHEDULER_SKIPPED",
            Event::SchedulerBackupFailed => "SCHEDULER_BACKUP_FAILED",
            Event::SchedulerStopped => "SCHEDULER_STOPPED",
            Event::SchedulerAborted => "SCHEDULER_ABORTED",

            Event::ConfigLoaded => "CONFIG_LOADED",
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::DbOpenFailed | Event::MigrationFailed)
    }

    /// Returns true if this event reports a recoverable problem
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            Event::DbStaleTempRemoved
                | Event::MigrationStatementSkipped
                | Event::BackupInvalid
                | Event::BackupRotationFailed
                | Event::BackupPruned
                | Event::SchedulerBackupFailed
        )
    }

    /// Returns true if this event reports a failed operation
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Event::DbSaveFailed | Event::RestoreFailed | Event::SchedulerAborted
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
