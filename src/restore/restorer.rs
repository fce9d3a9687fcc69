//! Restore from a catalogued snapshot
//!
//! # Algorithm
//!
//! 1. Resolve the catalogue entry
//! 2. Check the snapshot file exists and is a valid image
//! 3. Copy the live file to `emergency-backup-<ts>.db`
//! 4. Stage the snapshot at `<path>.tmp`, rename it over the live file
//! 5. `reload()` the database
//! 6. Re-insert catalogue entries known before the restore whose files
//!    still exist
//!
//! Steps 1 and 2 fail without touching anything. A crash between 4 and 5
//! leaves a valid image at the live path; a crash during the staging copy
//! leaves a stale `<path>.tmp` that the next `initialize()` removes.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;

use super::errors::{RestoreError, RestoreResult};
use crate::backup::catalogue::{self, BackupRecord};
use crate::backup::files::{copy_with_fsync, timestamped_path, EMERGENCY_PREFIX};
use crate::crash_point::{maybe_crash, points};
use crate::observability::{log_event_with_fields, Event};
use crate::storage::{verify_image, Database, ImageWriter};

/// Outcome of a successful restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    /// The snapshot now live
    pub restored: BackupRecord,
    /// Safety copy of the state that was replaced
    pub emergency_backup: PathBuf,
    /// Catalogue entries carried over from before the restore
    pub recatalogued: usize,
}

/// Replaces the live database of `db` with backup `id`.
///
/// The emergency copy is written to `backup_dir`.
pub fn restore_backup(db: &mut Database, backup_dir: &Path, id: i64) -> RestoreResult<RestoreReport> {
    let id_field = id.to_string();
    match restore_inner(db, backup_dir, id) {
        Ok(report) => {
            let emergency = report.emergency_backup.display().to_string();
            log_event_with_fields(
                Event::RestoreComplete,
                &[
                    ("id", &id_field),
                    ("filename", &report.restored.filename),
                    ("emergency_backup", &emergency),
                ],
            );
            Ok(report)
        }
        Err(err) => {
            let reason = err.to_string();
            log_event_with_fields(Event::RestoreFailed, &[("id", &id_field), ("reason", &reason)]);
            Err(err)
        }
    }
}

fn restore_inner(db: &mut Database, backup_dir: &Path, id: i64) -> RestoreResult<RestoreReport> {
    let record = catalogue::find(db, id)?.ok_or_else(|| RestoreError::not_found(id))?;

    if !record.filepath.exists() {
        return Err(RestoreError::missing_file(&record.filepath));
    }
    verify_image(&record.filepath).map_err(|d| RestoreError::invalid_backup(&record.filepath, d))?;

    let known = catalogue::records(db)?;

    // Emergency copy of the current state
    fs::create_dir_all(backup_dir).map_err(|e| {
        RestoreError::io(
            format!("could not create {}", backup_dir.display()),
            Some(Box::new(e)),
        )
    })?;
    let emergency = timestamped_path(backup_dir, EMERGENCY_PREFIX, Utc::now());
    copy_with_fsync(db.path(), &emergency).map_err(|e| {
        RestoreError::io("could not write emergency backup", Some(Box::new(e)))
    })?;
    let emergency_field = emergency.display().to_string();
    log_event_with_fields(Event::RestoreEmergencyCopy, &[("path", &emergency_field)]);
    maybe_crash(points::RESTORE_AFTER_EMERGENCY_COPY);

    // Copy-over through the writer's temp path
    let staging = ImageWriter::new(db.path()).temp_path().to_path_buf();
    copy_with_fsync(&record.filepath, &staging).map_err(|e| {
        let _ = fs::remove_file(&staging);
        RestoreError::io("could not stage backup", Some(Box::new(e)))
    })?;
    fs::rename(&staging, db.path()).map_err(|e| {
        RestoreError::io("could not replace live database", Some(Box::new(e)))
    })?;
    maybe_crash(points::RESTORE_AFTER_COPY_OVER);

    db.reload().map_err(|e| {
        RestoreError::io("could not reload restored database", Some(Box::new(e)))
    })?;

    let survivors: Vec<BackupRecord> = known
        .into_iter()
        .filter(|r| r.filepath.exists())
        .collect();
    let recatalogued = catalogue::reinsert(db, &survivors)?;

    Ok(RestoreReport {
        restored: record,
        emergency_backup: emergency,
        recatalogued,
    })
}
