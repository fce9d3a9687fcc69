//! Backup and Restore Invariant Tests
//!
//! Tests for invariants:
//! - Rotation keeps exactly the newest `max_backups` snapshots
//! - Restore of an unusable snapshot leaves the live file byte-identical
//! - Restore always writes an emergency copy of the replaced state
//! - Clearing data never touches migrations, backups or settings

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vaultdb::backup::{BackupManager, BackupRecord};
use vaultdb::migration::Migrator;
use vaultdb::restore::RestoreErrorCode;
use vaultdb::settings::load_auto_backup_config;
use vaultdb::storage::{Database, Value};

// =============================================================================
// Test Utilities
// =============================================================================

fn create_temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp dir")
}

fn count(db: &Database, table: &str) -> i64 {
    db.query(&format!("SELECT count(*) AS n FROM {}", table), &[])
        .unwrap()[0]
        .get_i64("n")
        .unwrap()
}

fn count_in_file(path: &Path, table: &str) -> i64 {
    let scratch = create_temp_dir();
    let copy = scratch.path().join("copy.db");
    fs::copy(path, &copy).unwrap();
    let db = Database::open(&copy).unwrap();
    count(&db, table)
}

fn backup_files(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map_or(false, |n| n.starts_with(prefix))
        })
        .collect();
    files.sort();
    files
}

fn setup(dir: &TempDir, max_backups: usize) -> (Database, BackupManager) {
    let mut db = Database::open(dir.path().join("app.db")).unwrap();
    db.execute("CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, v TEXT)", &[])
        .unwrap();
    let manager = BackupManager::new(dir.path().join("backups"), max_backups);
    (db, manager)
}

// =============================================================================
// Rotation
// =============================================================================

/// N+1 backups with retention N keep exactly the N most recent.
#[test]
fn test_rotation_keeps_newest() {
    let dir = create_temp_dir();
    let (mut db, manager) = setup(&dir, 3);

    let mut created: Vec<BackupRecord> = Vec::new();
    for i in 0..4 {
        db.execute("INSERT INTO t (v) VALUES (?1)", &[Value::Integer(i)])
            .unwrap();
        created.push(manager.create_backup(&mut db).unwrap());
    }

    let listed = manager.list_backups(&mut db).unwrap();
    let listed_ids: Vec<i64> = listed.iter().map(|r| r.id).collect();
    let expected: Vec<i64> = created[1..].iter().rev().map(|r| r.id).collect();
    assert_eq!(listed_ids, expected);

    assert!(!created[0].filepath.exists());
    assert_eq!(backup_files(manager.backup_dir(), "backup-").len(), 3);
}

/// A snapshot whose file was deleted externally does not take a retention
/// slot from one that still exists.
#[test]
fn test_rotation_ignores_missing_files() {
    let dir = create_temp_dir();
    let (mut db, manager) = setup(&dir, 3);

    let a = manager.create_backup(&mut db).unwrap();
    let b = manager.create_backup(&mut db).unwrap();
    let c = manager.create_backup(&mut db).unwrap();
    fs::remove_file(&c.filepath).unwrap();
    let d = manager.create_backup(&mut db).unwrap();

    assert!(a.filepath.exists());
    assert!(b.filepath.exists());
    let listed: Vec<i64> = manager
        .list_backups(&mut db)
        .unwrap()
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(listed, vec![d.id, b.id, a.id]);
}

/// Backups are newest first and record the size on disk.
#[test]
fn test_backup_record_matches_file() {
    let dir = create_temp_dir();
    let (mut db, manager) = setup(&dir, 5);

    let record = manager.create_backup(&mut db).unwrap();

    assert!(record.filename.starts_with("backup-"));
    assert!(record.filename.ends_with(".db"));
    assert_eq!(fs::metadata(&record.filepath).unwrap().len(), record.size);
    assert!(record.created_at_utc().is_some());
    assert!(load_auto_backup_config(&db).unwrap().last_backup_at.is_some());
}

// =============================================================================
// Restore
// =============================================================================

/// Restore of a snapshot deleted externally fails and changes nothing.
#[test]
fn test_restore_missing_file_leaves_live_file_unchanged() {
    let dir = create_temp_dir();
    let (mut db, manager) = setup(&dir, 5);
    db.execute("INSERT INTO t (v) VALUES ('a')", &[]).unwrap();
    let record = manager.create_backup(&mut db).unwrap();
    fs::remove_file(&record.filepath).unwrap();
    let live = db.path().to_path_buf();
    let before = fs::read(&live).unwrap();

    let err = manager.restore_backup(&mut db, record.id).unwrap_err();

    assert_eq!(err.code(), RestoreErrorCode::MissingFile);
    assert!(err.is_fatal());
    assert_eq!(fs::read(&live).unwrap(), before);
    assert!(backup_files(manager.backup_dir(), "emergency-backup-").is_empty());
}

/// init + seed, backup, insert, restore: back to one row, and the
/// emergency copy holds the two-row state.
#[test]
fn test_restore_scenario_with_migrations() {
    let dir = create_temp_dir();
    let migrations = dir.path().join("migrations");
    fs::create_dir_all(&migrations).unwrap();
    fs::write(
        migrations.join("0001_init.sql"),
        "CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT);",
    )
    .unwrap();
    fs::write(migrations.join("0002_seed.sql"), "INSERT INTO t (v) VALUES ('seed');").unwrap();

    let mut db = Database::open(dir.path().join("app.db")).unwrap();
    Migrator::new(&migrations).run(&mut db).unwrap();
    assert_eq!(count(&db, "t"), 1);

    let manager = BackupManager::new(dir.path().join("backups"), 10);
    let snapshot = manager.create_backup(&mut db).unwrap();

    db.execute("INSERT INTO t (v) VALUES ('second')", &[]).unwrap();
    assert_eq!(count(&db, "t"), 2);

    let report = manager.restore_backup(&mut db, snapshot.id).unwrap();

    assert_eq!(count(&db, "t"), 1);
    assert_eq!(count_in_file(&report.emergency_backup, "t"), 2);
    let emergencies = backup_files(manager.backup_dir(), "emergency-backup-");
    assert_eq!(emergencies, vec![report.emergency_backup.clone()]);

    // The restored state is durable
    drop(db);
    let db = Database::open(dir.path().join("app.db")).unwrap();
    assert_eq!(count(&db, "t"), 1);
}

// =============================================================================
// Clear data
// =============================================================================

#[test]
fn test_clear_all_data_keeps_system_tables() {
    let dir = create_temp_dir();
    let (mut db, manager) = setup(&dir, 5);
    db.execute("CREATE TABLE u (v TEXT)", &[]).unwrap();
    db.execute("INSERT INTO t (v) VALUES ('a')", &[]).unwrap();
    db.execute("INSERT INTO u (v) VALUES ('b')", &[]).unwrap();
    manager.create_backup(&mut db).unwrap();

    let mut cleared = manager.clear_all_data(&mut db).unwrap();
    cleared.sort();

    assert_eq!(cleared, vec!["t".to_string(), "u".to_string()]);
    assert_eq!(count(&db, "t"), 0);
    assert_eq!(count(&db, "u"), 0);
    assert_eq!(manager.list_backups(&mut db).unwrap().len(), 1);
    assert!(load_auto_backup_config(&db).unwrap().last_backup_at.is_some());

    // AUTOINCREMENT restarts
    db.execute("INSERT INTO t (v) VALUES ('again')", &[]).unwrap();
    let rows = db.query("SELECT id FROM t", &[]).unwrap();
    assert_eq!(rows[0].get_i64("id"), Some(1));
}
