//! Crash before a migration commits
//!
//! The script leaves neither its changes nor its record behind, and the
//! next run applies it normally.

use std::fs;

use vaultdb::crash_point::points;
use vaultdb::migration::applied_migrations;

use crate::crash::{assert_crashed, assert_durable_file_valid, Workspace};

#[test]
fn test_crash_before_commit_leaves_script_pending() {
    let ws = Workspace::new();
    drop(ws.open());
    fs::write(
        ws.migrations_dir().join("0001_init.sql"),
        "CREATE TABLE t (v TEXT);",
    )
    .unwrap();

    let result = ws.run_with_crash_point(points::MIGRATION_BEFORE_COMMIT, &["migrate"]);

    assert_crashed(&result, points::MIGRATION_BEFORE_COMMIT);
    assert_durable_file_valid(&ws.db_path());
    {
        let db = ws.open();
        assert!(!db.table_exists("t").unwrap());
        assert!(applied_migrations(&db).unwrap().is_empty());
    }

    let result = ws.run(&["migrate"]);
    assert!(result.exit_status.success(), "stderr: {}", result.stderr);

    let db = ws.open();
    assert!(db.table_exists("t").unwrap());
    assert_eq!(applied_migrations(&db).unwrap().len(), 1);
}
