//! Forward-only migration runner
//!
//! # Algorithm
//!
//! 1. Load `*.sql` scripts sorted by filename
//! 2. Diff against `migrations` rows by filename
//! 3. For each pending script, in order:
//!    a. Split into statements
//!    b. `BEGIN IMMEDIATE`
//!    c. Run statements; skip "already exists" failures, abort on others
//!    d. Insert the migration record in the same transaction
//!    e. Commit and save
//!
//! The first unrecovered failure rolls back its script, leaves no record
//! for it, and stops the run. Later scripts are not attempted.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use rusqlite::types::Value;
use serde::Serialize;

use super::classify::is_already_exists;
use super::errors::{MigrationError, MigrationResult};
use super::loader::{load_scripts, SchemaChangeScript};
use super::splitter::split_statements;
use crate::crash_point::{maybe_crash, points};
use crate::observability::{log_event_with_fields, Event};
use crate::storage::Database;

/// A row of the `migrations` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationRecord {
    pub filename: String,
    pub checksum: String,
    pub applied_at: String,
}

/// Outcome of one `Migrator::run`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    /// Filenames applied by this run, in order
    pub applied: Vec<String>,
    /// Statements skipped because their object already existed
    pub skipped_statements: usize,
    /// Scripts found on disk that were already recorded
    pub already_applied: usize,
}

/// Applies pending scripts from one directory
#[derive(Debug, Clone)]
pub struct Migrator {
    dir: PathBuf,
}

impl Migrator {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scripts on disk without a migration record, in apply order
    pub fn pending(&self, db: &Database) -> MigrationResult<Vec<SchemaChangeScript>> {
        without_applied(db, load_scripts(&self.dir)?)
    }

    /// Applies every pending script. Must run before business access.
    pub fn run(&self, db: &mut Database) -> MigrationResult<MigrationReport> {
        let dir = self.dir.display().to_string();
        log_event_with_fields(Event::MigrationRunBegin, &[("dir", &dir)]);

        let scripts = load_scripts(&self.dir)?;
        let total = scripts.len();
        let pending = without_applied(db, scripts)?;
        let mut report = MigrationReport {
            already_applied: total - pending.len(),
            ..MigrationReport::default()
        };

        for script in &pending {
            match apply_script(db, script) {
                Ok(skipped) => {
                    report.skipped_statements += skipped;
                    report.applied.push(script.filename.clone());
                    log_event_with_fields(
                        Event::MigrationApplied,
                        &[("filename", &script.filename), ("checksum", &script.checksum)],
                    );
                }
                Err(err) => {
                    let reason = err.to_string();
                    log_event_with_fields(
                        Event::MigrationFailed,
                        &[("filename", &script.filename), ("reason", &reason)],
                    );
                    return Err(err);
                }
            }
        }

        let applied = report.applied.len().to_string();
        let skipped = report.skipped_statements.to_string();
        log_event_with_fields(
            Event::MigrationRunComplete,
            &[("applied", &applied), ("skipped_statements", &skipped)],
        );
        Ok(report)
    }
}

fn without_applied(
    db: &Database,
    scripts: Vec<SchemaChangeScript>,
) -> MigrationResult<Vec<SchemaChangeScript>> {
    let applied: HashSet<String> = applied_migrations(db)?
        .into_iter()
        .map(|r| r.filename)
        .collect();

    Ok(scripts
        .into_iter()
        .filter(|s| !applied.contains(&s.filename))
        .collect())
}

/// Applies one script in its own transaction. Returns the number of
/// skipped statements.
fn apply_script(db: &mut Database, script: &SchemaChangeScript) -> MigrationResult<usize> {
    let statements = split_statements(&script.sql);

    db.run_in_transaction(|tx| {
        let mut skipped = 0;
        for statement in &statements {
            match tx.execute(statement, &[]) {
                Ok(_) => {}
                Err(err) if err.sqlite_error().map_or(false, is_already_exists) => {
                    skipped += 1;
                    log_event_with_fields(
                        Event::MigrationStatementSkipped,
                        &[("filename", &script.filename), ("reason", err.message())],
                    );
                }
                Err(err) => return Err(MigrationError::statement_failed(&script.filename, err)),
            }
        }

        tx.execute(
            "INSERT INTO migrations (filename, checksum, applied_at) VALUES (?1, ?2, ?3)",
            &[
                Value::Text(script.filename.clone()),
                Value::Text(script.checksum.clone()),
                Value::Text(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
            ],
        )
        .map_err(|e| MigrationError::statement_failed(&script.filename, e))?;

        maybe_crash(points::MIGRATION_BEFORE_COMMIT);
        Ok(skipped)
    })
}

/// Every recorded migration, in apply order
pub fn applied_migrations(db: &Database) -> MigrationResult<Vec<MigrationRecord>> {
    let rows = db.query(
        "SELECT filename, checksum, applied_at FROM migrations ORDER BY id",
        &[],
    )?;

    Ok(rows
        .iter()
        .map(|row| MigrationRecord {
            filename: row.get_str("filename").unwrap_or_default().to_string(),
            checksum: row.get_str("checksum").unwrap_or_default().to_string(),
            applied_at: row.get_str("applied_at").unwrap_or_default().to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::MigrationErrorCode;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        db: Database,
        migrator: Migrator,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("app.db")).unwrap();
        let migrator = Migrator::new(dir.path().join("migrations"));
        fs::create_dir(migrator.dir()).unwrap();
        Fixture { dir, db, migrator }
    }

    fn write(f: &Fixture, name: &str, sql: &str) {
        fs::write(f.migrator.dir().join(name), sql).unwrap();
    }

    fn count(db: &Database, table: &str) -> i64 {
        db.query(&format!("SELECT count(*) AS n FROM {}", table), &[])
            .unwrap()[0]
            .get_i64("n")
            .unwrap()
    }

    #[test]
    fn test_applies_in_filename_order() {
        let mut f = fixture();
        write(&f, "0002_seed.sql", "INSERT INTO t (v) VALUES ('a');");
        write(&f, "0001_init.sql", "CREATE TABLE t (id INTEGER PRIMARY KEY, v TEXT);");

        let report = f.migrator.run(&mut f.db).unwrap();

        assert_eq!(report.applied, vec!["0001_init.sql", "0002_seed.sql"]);
        assert_eq!(count(&f.db, "t"), 1);
        let records = applied_migrations(&f.db).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].checksum.len(), 64);
    }

    #[test]
    fn test_second_run_is_noop() {
        let mut f = fixture();
        write(&f, "0001_init.sql", "CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('a');");

        f.migrator.run(&mut f.db).unwrap();
        let report = f.migrator.run(&mut f.db).unwrap();

        assert!(report.applied.is_empty());
        assert_eq!(report.already_applied, 1);
        assert_eq!(count(&f.db, "t"), 1);
        assert!(f.migrator.pending(&f.db).unwrap().is_empty());
    }

    #[test]
    fn test_already_exists_statements_skipped() {
        let mut f = fixture();
        f.db.execute("CREATE TABLE t (v TEXT)", &[]).unwrap();
        write(
            &f,
            "0001_init.sql",
            "CREATE TABLE t (v TEXT);\nALTER TABLE t ADD COLUMN w TEXT;\nALTER TABLE t ADD COLUMN w TEXT;",
        );

        let report = f.migrator.run(&mut f.db).unwrap();

        assert_eq!(report.skipped_statements, 2);
        assert_eq!(report.applied, vec!["0001_init.sql"]);
    }

    #[test]
    fn test_failure_rolls_back_and_stops() {
        let mut f = fixture();
        write(&f, "0001_init.sql", "CREATE TABLE t (v TEXT);");
        write(
            &f,
            "0002_broken.sql",
            "CREATE TABLE u (v TEXT); INSERT INTO nowhere VALUES (1);",
        );
        write(&f, "0003_later.sql", "CREATE TABLE w (v TEXT);");

        let err = f.migrator.run(&mut f.db).unwrap_err();

        assert_eq!(err.code(), MigrationErrorCode::Failed);
        assert_eq!(err.script(), Some("0002_broken.sql"));
        assert_eq!(err.statement(), Some("INSERT INTO nowhere VALUES (1)"));
        assert!(err.is_fatal());

        let names: Vec<_> = applied_migrations(&f.db)
            .unwrap()
            .into_iter()
            .map(|r| r.filename)
            .collect();
        assert_eq!(names, vec!["0001_init.sql"]);
        let tables = f
            .db
            .query("SELECT name FROM sqlite_master WHERE name IN ('u', 'w')", &[])
            .unwrap();
        assert!(tables.is_empty());
    }

    #[test]
    fn test_applied_state_is_durable() {
        let mut f = fixture();
        write(&f, "0001_init.sql", "CREATE TABLE t (v TEXT);");
        f.migrator.run(&mut f.db).unwrap();
        let path = f.db.path().to_path_buf();
        drop(f.db);

        let db = Database::open(&path).unwrap();
        assert_eq!(applied_migrations(&db).unwrap().len(), 1);
        assert!(f.migrator.pending(&db).unwrap().is_empty());
        drop(f.dir);
    }

    #[test]
    fn test_missing_directory_applies_nothing() {
        let dir = TempDir::new().unwrap();
        let mut db = Database::open(dir.path().join("app.db")).unwrap();
        let report = Migrator::new(dir.path().join("none")).run(&mut db).unwrap();
        assert_eq!(report, MigrationReport::default());
    }
}
