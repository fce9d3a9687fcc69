//! Crashes inside the atomic write protocol
//!
//! Before the rename the previous image survives; after it the new one
//! does. Either way the durable file opens.

use std::fs;

use vaultdb::crash_point::points;
use vaultdb::storage::verify_image;

use crate::crash::{assert_crashed, assert_durable_file_valid, count_rows, Workspace};

fn seeded() -> Workspace {
    let ws = Workspace::new();
    let mut db = ws.open();
    db.execute("CREATE TABLE t (v TEXT)", &[]).unwrap();
    db.execute("INSERT INTO t VALUES ('first')", &[]).unwrap();
    ws
}

const INSERT: &str = "INSERT INTO t VALUES ('second')";

#[test]
fn test_crash_after_temp_write_keeps_previous_image() {
    let ws = seeded();

    let result = ws.run_with_crash_point(points::SAVE_AFTER_TEMP_WRITE, &["exec", INSERT]);

    assert_crashed(&result, points::SAVE_AFTER_TEMP_WRITE);
    assert_durable_file_valid(&ws.db_path());
    assert!(ws.temp_path().exists());

    let db = ws.open();
    assert!(!ws.temp_path().exists());
    assert_eq!(count_rows(&db, "t"), 1);
}

/// The `.backup` companion is replaced by rename, never rewritten in place
#[test]
fn test_crash_before_backup_rename_keeps_backup_companion() {
    let ws = seeded();
    {
        let mut db = ws.open();
        db.execute("INSERT INTO t VALUES ('between')", &[]).unwrap();
    }
    let companion = ws.db_path().with_extension("db.backup");
    let before = fs::read(&companion).unwrap();

    let result = ws.run_with_crash_point(points::SAVE_BEFORE_BACKUP_RENAME, &["exec", INSERT]);

    assert_crashed(&result, points::SAVE_BEFORE_BACKUP_RENAME);
    assert_durable_file_valid(&ws.db_path());
    assert_eq!(fs::read(&companion).unwrap(), before);
    assert!(verify_image(&companion).is_ok());

    let db = ws.open();
    assert_eq!(count_rows(&db, "t"), 2);
}

#[test]
fn test_crash_before_rename_keeps_previous_image() {
    let ws = seeded();

    let result = ws.run_with_crash_point(points::SAVE_BEFORE_RENAME, &["exec", INSERT]);

    assert_crashed(&result, points::SAVE_BEFORE_RENAME);
    assert_durable_file_valid(&ws.db_path());

    let db = ws.open();
    assert_eq!(count_rows(&db, "t"), 1);
}

#[test]
fn test_crash_after_rename_keeps_new_image() {
    let ws = seeded();

    let result = ws.run_with_crash_point(points::SAVE_AFTER_RENAME, &["exec", INSERT]);

    assert_crashed(&result, points::SAVE_AFTER_RENAME);
    assert_durable_file_valid(&ws.db_path());
    assert!(!ws.temp_path().exists());

    let db = ws.open();
    assert_eq!(count_rows(&db, "t"), 2);
}

#[test]
fn test_exec_without_crash_point_succeeds() {
    let ws = seeded();

    let result = ws.run(&["exec", INSERT]);

    assert!(result.exit_status.success(), "stderr: {}", result.stderr);
    assert!(result.stdout.contains(r#""status":"ok""#));
    let db = ws.open();
    assert_eq!(count_rows(&db, "t"), 2);
}
