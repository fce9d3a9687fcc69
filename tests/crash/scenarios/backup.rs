//! Crash between the backup copy and its catalogue entry
//!
//! The live file is untouched and the uncatalogued copy does not show up
//! in the listing.

use std::fs;

use vaultdb::backup::BackupManager;
use vaultdb::crash_point::points;

use crate::crash::{assert_crashed, assert_durable_file_valid, count_rows, Workspace};

#[test]
fn test_crash_after_copy_leaves_backup_uncatalogued() {
    let ws = Workspace::new();
    {
        let mut db = ws.open();
        db.execute("CREATE TABLE t (v TEXT)", &[]).unwrap();
        db.execute("INSERT INTO t VALUES ('a')", &[]).unwrap();
    }
    let before = fs::read(ws.db_path()).unwrap();

    let result = ws.run_with_crash_point(points::BACKUP_AFTER_COPY, &["backup", "create"]);

    assert_crashed(&result, points::BACKUP_AFTER_COPY);
    assert_durable_file_valid(&ws.db_path());
    assert_eq!(fs::read(ws.db_path()).unwrap(), before);

    let mut db = ws.open();
    assert_eq!(count_rows(&db, "t"), 1);
    let manager = BackupManager::new(ws.backup_dir(), 5);
    assert!(manager.list_backups(&mut db).unwrap().is_empty());

    // A later backup works normally
    manager.create_backup(&mut db).unwrap();
    assert_eq!(manager.list_backups(&mut db).unwrap().len(), 1);
}
