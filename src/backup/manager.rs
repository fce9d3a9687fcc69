//! Snapshot creation, rotation, listing and deletion

use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use rusqlite::types::Value;

use super::catalogue::{self, BackupRecord, BACKUPS_TABLE};
use super::errors::{BackupError, BackupResult};
use super::files::{copy_with_fsync, remove_if_present, timestamped_path, BACKUP_PREFIX};
use super::validator::validate_backup_file;
use crate::config::VaultConfig;
use crate::crash_point::{maybe_crash, points};
use crate::observability::{log_event_with_fields, Event, ObservationScope};
use crate::restore::{self, RestoreReport, RestoreResult};
use crate::settings::{self, SETTINGS_TABLE};
use crate::storage::{Database, Statement, MIGRATIONS_TABLE};

/// Tables `clear_all_data` never touches
const PROTECTED_TABLES: [&str; 3] = [MIGRATIONS_TABLE, BACKUPS_TABLE, SETTINGS_TABLE];

/// Manages snapshots of one database in one backup directory
#[derive(Debug, Clone)]
pub struct BackupManager {
    backup_dir: PathBuf,
    max_backups: usize,
}

impl BackupManager {
    /// `max_backups` below 1 is raised to 1
    pub fn new(backup_dir: impl Into<PathBuf>, max_backups: usize) -> Self {
        Self {
            backup_dir: backup_dir.into(),
            max_backups: max_backups.max(1),
        }
    }

    pub fn from_config(config: &VaultConfig) -> Self {
        Self::new(config.backup_dir.clone(), config.max_backups)
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Changes where new snapshots go. Existing snapshots stay where they
    /// are and remain catalogued.
    pub fn set_backup_dir(&mut self, dir: impl Into<PathBuf>) {
        self.backup_dir = dir.into();
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Copies the durable file into the backup directory, validates the
    /// copy, catalogues it and rotates.
    ///
    /// An invalid copy is deleted and never catalogued.
    pub fn create_backup(&self, db: &mut Database) -> BackupResult<BackupRecord> {
        let dir = self.backup_dir.display().to_string();
        let scope = ObservationScope::with_fields("BACKUP", &[("dir", &dir)]);

        match self.snapshot(db) {
            Ok(record) => {
                let id = record.id.to_string();
                let size = record.size.to_string();
                scope.complete_with_fields(&[
                    ("id", &id),
                    ("filename", &record.filename),
                    ("size", &size),
                ]);
                self.rotate_backups(db);
                Ok(record)
            }
            Err(err) => {
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    fn snapshot(&self, db: &mut Database) -> BackupResult<BackupRecord> {
        std::fs::create_dir_all(&self.backup_dir)
            .map_err(|e| BackupError::io_at_path(&self.backup_dir, e))?;

        let now = Utc::now();
        let target = timestamped_path(&self.backup_dir, BACKUP_PREFIX, now);

        if let Err(e) = copy_with_fsync(db.path(), &target) {
            let _ = remove_if_present(&target);
            return Err(BackupError::io_at_path(&target, e));
        }
        maybe_crash(points::BACKUP_AFTER_COPY);

        let size = match validate_backup_file(&target) {
            Ok(size) => size,
            Err(err) => {
                let _ = remove_if_present(&target);
                let reason = err.to_string();
                log_event_with_fields(Event::BackupInvalid, &[("reason", &reason)]);
                return Err(err);
            }
        };

        let filename = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let created_at = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        // last_backup_at and the catalogue row land in one transaction
        let mut statements = settings::last_backup_statements(now);
        statements.extend(catalogue::insert_statements(
            &filename,
            &target.to_string_lossy(),
            size,
            &created_at,
        ));

        match db.transaction(&statements) {
            Ok(rows) => catalogue::inserted(&rows)
                .ok_or_else(|| BackupError::catalogue("insert returned no backup record")),
            Err(err) => {
                let _ = remove_if_present(&target);
                Err(err.into())
            }
        }
    }

    /// Keeps the `max_backups` newest snapshots and deletes the rest.
    /// Records whose file is gone are pruned first and do not take a slot.
    ///
    /// Failures are logged, never returned. Returns the number of snapshot
    /// files removed.
    pub fn rotate_backups(&self, db: &mut Database) -> usize {
        let (present, missing): (Vec<_>, Vec<_>) = match catalogue::records(db) {
            Ok(records) => records,
            Err(err) => {
                let reason = err.to_string();
                log_event_with_fields(Event::BackupRotationFailed, &[("reason", &reason)]);
                return 0;
            }
        }
        .into_iter()
        .partition(|r| r.filepath.exists());

        let mut stale: Vec<i64> = missing.iter().map(|r| r.id).collect();
        for record in &missing {
            log_event_with_fields(Event::BackupPruned, &[("filename", &record.filename)]);
        }

        let mut removed = Vec::new();
        for record in present.iter().skip(self.max_backups) {
            match remove_if_present(&record.filepath) {
                Ok(()) => {
                    removed.push(record.id);
                    log_event_with_fields(Event::BackupRotated, &[("filename", &record.filename)]);
                }
                Err(e) => {
                    let reason = e.to_string();
                    log_event_with_fields(
                        Event::BackupRotationFailed,
                        &[("filename", &record.filename), ("reason", &reason)],
                    );
                }
            }
        }

        stale.extend(&removed);
        if let Err(err) = catalogue::remove(db, &stale) {
            let reason = err.to_string();
            log_event_with_fields(Event::BackupRotationFailed, &[("reason", &reason)]);
            return 0;
        }
        removed.len()
    }

    /// Catalogued snapshots, newest first. Records whose file is gone are
    /// pruned.
    pub fn list_backups(&self, db: &mut Database) -> BackupResult<Vec<BackupRecord>> {
        let (present, missing): (Vec<_>, Vec<_>) = catalogue::records(db)?
            .into_iter()
            .partition(|r| r.filepath.exists());

        if !missing.is_empty() {
            let ids: Vec<i64> = missing.iter().map(|r| r.id).collect();
            catalogue::remove(db, &ids)?;
            for record in &missing {
                log_event_with_fields(Event::BackupPruned, &[("filename", &record.filename)]);
            }
        }

        Ok(present)
    }

    /// Deletes a snapshot file (if present) and its record
    pub fn delete_backup(&self, db: &mut Database, id: i64) -> BackupResult<BackupRecord> {
        let record = catalogue::find(db, id)?.ok_or_else(|| BackupError::unknown_backup(id))?;

        remove_if_present(&record.filepath)
            .map_err(|e| BackupError::io_at_path(&record.filepath, e))?;
        catalogue::remove(db, &[record.id])?;

        log_event_with_fields(Event::BackupDeleted, &[("filename", &record.filename)]);
        Ok(record)
    }

    /// Replaces the live database with a catalogued snapshot
    pub fn restore_backup(&self, db: &mut Database, id: i64) -> RestoreResult<RestoreReport> {
        restore::restore_backup(db, &self.backup_dir, id)
    }

    /// Empties every user table except the bookkeeping tables, in one
    /// transaction, and resets their AUTOINCREMENT counters. Returns the
    /// cleared table names.
    pub fn clear_all_data(&self, db: &mut Database) -> BackupResult<Vec<String>> {
        let rows = db.query(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
            &[],
        )?;
        let tables: Vec<String> = rows
            .iter()
            .filter_map(|r| r.get_str("name"))
            .filter(|name| !PROTECTED_TABLES.contains(name))
            .map(str::to_string)
            .collect();

        if tables.is_empty() {
            return Ok(tables);
        }

        let mut statements: Vec<Statement> = tables
            .iter()
            .map(|t| Statement::new(format!("DELETE FROM {}", quote_identifier(t))))
            .collect();
        if db.table_exists("sqlite_sequence")? {
            statements.extend(tables.iter().map(|t| {
                Statement::new("DELETE FROM sqlite_sequence WHERE name = ?1")
                    .with_params(vec![Value::Text(t.clone())])
            }));
        }
        db.transaction(&statements)?;

        let cleared = tables.join(",");
        log_event_with_fields(Event::DataCleared, &[("tables", &cleared)]);
        Ok(tables)
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::BackupErrorCode;
    use crate::settings::load_auto_backup_config;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        db: Database,
        manager: BackupManager,
    }

    fn fixture(max_backups: usize) -> Fixture {
        let dir = TempDir::new().unwrap();
        let mut db = Database::open(dir.path().join("app.db")).unwrap();
        db.execute(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT)",
            &[],
        )
        .unwrap();
        let manager = BackupManager::new(dir.path().join("backups"), max_backups);
        Fixture {
            _dir: dir,
            db,
            manager,
        }
    }

    #[test]
    fn test_create_backup_catalogues_valid_copy() {
        let mut f = fixture(5);

        let record = f.manager.create_backup(&mut f.db).unwrap();

        assert!(record.filename.starts_with("backup-"));
        assert!(record.filepath.exists());
        assert_eq!(record.size, fs::metadata(&record.filepath).unwrap().len());
        assert_eq!(f.manager.list_backups(&mut f.db).unwrap(), vec![record]);
        assert!(load_auto_backup_config(&f.db).unwrap().last_backup_at.is_some());
    }

    #[test]
    fn test_invalid_copy_discarded() {
        let mut f = fixture(5);
        // Not a database, so the copy fails validation
        fs::write(f.db.path(), vec![0u8; 4096]).unwrap();

        let err = f.manager.create_backup(&mut f.db).unwrap_err();

        assert_eq!(err.code(), BackupErrorCode::ValidationFailed);
        let leftovers = fs::read_dir(f.manager.backup_dir()).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_rotation_keeps_newest() {
        let mut f = fixture(2);

        let mut created = Vec::new();
        for _ in 0..3 {
            created.push(f.manager.create_backup(&mut f.db).unwrap());
        }

        let listed = f.manager.list_backups(&mut f.db).unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![created[2].id, created[1].id]);
        assert!(!created[0].filepath.exists());
    }

    #[test]
    fn test_list_prunes_missing_files() {
        let mut f = fixture(5);
        let a = f.manager.create_backup(&mut f.db).unwrap();
        let b = f.manager.create_backup(&mut f.db).unwrap();
        fs::remove_file(&a.filepath).unwrap();

        assert_eq!(f.manager.list_backups(&mut f.db).unwrap(), vec![b.clone()]);
        assert_eq!(f.manager.list_backups(&mut f.db).unwrap(), vec![b]);
    }

    #[test]
    fn test_delete_backup() {
        let mut f = fixture(5);
        let a = f.manager.create_backup(&mut f.db).unwrap();

        f.manager.delete_backup(&mut f.db, a.id).unwrap();
        assert!(!a.filepath.exists());
        assert!(f.manager.list_backups(&mut f.db).unwrap().is_empty());

        let err = f.manager.delete_backup(&mut f.db, a.id).unwrap_err();
        assert_eq!(err.code(), BackupErrorCode::Catalogue);
    }

    #[test]
    fn test_set_backup_dir_keeps_existing() {
        let mut f = fixture(5);
        let first = f.manager.create_backup(&mut f.db).unwrap();

        let other = f.manager.backup_dir().with_file_name("elsewhere");
        f.manager.set_backup_dir(&other);
        let second = f.manager.create_backup(&mut f.db).unwrap();

        assert!(second.filepath.starts_with(&other));
        assert_eq!(f.manager.list_backups(&mut f.db).unwrap().len(), 2);
        assert!(first.filepath.exists());
    }

    #[test]
    fn test_clear_all_data_spares_bookkeeping() {
        let mut f = fixture(5);
        f.db.execute("INSERT INTO notes (body) VALUES ('a'), ('b')", &[])
            .unwrap();
        f.manager.create_backup(&mut f.db).unwrap();

        let cleared = f.manager.clear_all_data(&mut f.db).unwrap();

        assert_eq!(cleared, vec!["notes"]);
        let notes = f.db.query("SELECT count(*) AS n FROM notes", &[]).unwrap();
        assert_eq!(notes[0].get_i64("n"), Some(0));
        assert_eq!(f.manager.list_backups(&mut f.db).unwrap().len(), 1);

        // AUTOINCREMENT restarts
        let outcome = f
            .db
            .execute("INSERT INTO notes (body) VALUES ('c')", &[])
            .unwrap();
        assert_eq!(outcome.last_insert_rowid, 1);
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
    }
}
