//! Crashes during restore
//!
//! After the emergency copy the live file is still the old state; after
//! the copy-over it is the snapshot. The live file is valid either way.

use vaultdb::backup::{BackupManager, BackupRecord};
use vaultdb::crash_point::points;

use crate::crash::{assert_crashed, assert_durable_file_valid, count_rows, Workspace};

/// One row in the snapshot, two in the live file
fn prepared() -> (Workspace, BackupRecord) {
    let ws = Workspace::new();
    let mut db = ws.open();
    db.execute("CREATE TABLE t (v TEXT)", &[]).unwrap();
    db.execute("INSERT INTO t VALUES ('a')", &[]).unwrap();
    let record = BackupManager::new(ws.backup_dir(), 5)
        .create_backup(&mut db)
        .unwrap();
    db.execute("INSERT INTO t VALUES ('b')", &[]).unwrap();
    (ws, record)
}

#[test]
fn test_crash_after_emergency_copy_keeps_live_state() {
    let (ws, record) = prepared();
    let id = record.id.to_string();

    let result = ws.run_with_crash_point(
        points::RESTORE_AFTER_EMERGENCY_COPY,
        &["backup", "restore", &id],
    );

    assert_crashed(&result, points::RESTORE_AFTER_EMERGENCY_COPY);
    assert_durable_file_valid(&ws.db_path());
    let db = ws.open();
    assert_eq!(count_rows(&db, "t"), 2);
}

#[test]
fn test_crash_after_copy_over_leaves_snapshot_live() {
    let (ws, record) = prepared();
    let id = record.id.to_string();

    let result = ws.run_with_crash_point(
        points::RESTORE_AFTER_COPY_OVER,
        &["backup", "restore", &id],
    );

    assert_crashed(&result, points::RESTORE_AFTER_COPY_OVER);
    assert_durable_file_valid(&ws.db_path());
    assert!(!ws.temp_path().exists());
    let db = ws.open();
    assert_eq!(count_rows(&db, "t"), 1);
}

#[test]
fn test_restore_through_cli() {
    let (ws, record) = prepared();
    let id = record.id.to_string();

    let result = ws.run(&["backup", "restore", &id]);

    assert!(result.exit_status.success(), "stderr: {}", result.stderr);
    assert!(result.stdout.contains("emergency_backup"));
    let db = ws.open();
    assert_eq!(count_rows(&db, "t"), 1);
}
