//! Crash test harness for subprocess management
//!
//! This harness:
//! - Writes a config file into a fresh temp directory
//! - Starts the `vaultdb` binary, optionally with a crash point
//! - Validates post-crash state

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tempfile::TempDir;
use vaultdb::crash_point::CRASH_POINT_ENV;
use vaultdb::observability::LOG_LEVEL_ENV;
use vaultdb::storage::{verify_image, Database};

/// Result of one subprocess run
#[derive(Debug)]
pub struct CrashTestResult {
    /// Whether the process was terminated by the crash point
    pub crashed: bool,
    pub exit_status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// A config file plus the directories it points at
pub struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = dir.path().join("vaultdb.json");
        fs::write(
            &config,
            r#"{
                "database_path": "app.db",
                "migrations_dir": "migrations",
                "backup_dir": "backups",
                "max_backups": 5
            }"#,
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("migrations")).unwrap();
        Self { dir, config }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("app.db")
    }

    pub fn temp_path(&self) -> PathBuf {
        self.dir.path().join("app.db.tmp")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.dir.path().join("backups")
    }

    pub fn migrations_dir(&self) -> PathBuf {
        self.dir.path().join("migrations")
    }

    /// Opens the database in-process
    pub fn open(&self) -> Database {
        Database::open(self.db_path()).unwrap()
    }

    /// Runs `vaultdb <command> --config <config> <rest>` to completion
    pub fn run(&self, args: &[&str]) -> CrashTestResult {
        self.spawn(None, args)
    }

    /// Runs the binary with `VAULTDB_CRASH_POINT` set
    pub fn run_with_crash_point(&self, crash_point: &str, args: &[&str]) -> CrashTestResult {
        self.spawn(Some(crash_point), args)
    }

    fn spawn(&self, crash_point: Option<&str>, args: &[&str]) -> CrashTestResult {
        let (command, rest) = args.split_first().expect("command name required");
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_vaultdb"));
        cmd.arg(command)
            .arg("--config")
            .arg(&self.config)
            .args(rest)
            .env(LOG_LEVEL_ENV, "fatal")
            .env_remove(CRASH_POINT_ENV);
        if let Some(point) = crash_point {
            cmd.env(CRASH_POINT_ENV, point);
        }

        let output = cmd.output().expect("Failed to execute vaultdb");
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        CrashTestResult {
            crashed: !output.status.success() && stderr.contains("[CRASH]"),
            exit_status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr,
        }
    }
}

/// Count rows of `table` through a fresh handle
pub fn count_rows(db: &Database, table: &str) -> i64 {
    db.query(&format!("SELECT count(*) AS n FROM {}", table), &[])
        .unwrap()[0]
        .get_i64("n")
        .unwrap()
}

/// The durable file must exist and be a complete image after any crash
pub fn assert_durable_file_valid(path: &Path) {
    if let Err(defect) = verify_image(path) {
        panic!("durable file {} invalid after crash: {}", path.display(), defect);
    }
}

/// Asserts the run ended at its crash point, printing output otherwise
pub fn assert_crashed(result: &CrashTestResult, crash_point: &str) {
    assert!(
        result.crashed,
        "expected crash at {}; status: {:?}\nstdout:\n{}\nstderr:\n{}",
        crash_point, result.exit_status, result.stdout, result.stderr
    );
}
