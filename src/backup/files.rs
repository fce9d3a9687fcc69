//! Snapshot file handling
//!
//! Snapshot names embed the UTC creation time so that a directory listing
//! sorts chronologically:
//!
//! ```text
//! backup-20240102T030405.678Z.db
//! backup-20240102T030405.678Z-1.db        (same millisecond)
//! emergency-backup-20240102T040000.000Z.db
//! ```

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

/// Prefix of regular snapshots
pub const BACKUP_PREFIX: &str = "backup";

/// Prefix of the safety copy taken before a restore
pub const EMERGENCY_PREFIX: &str = "emergency-backup";

/// A path in `dir` named after `now` that does not exist yet
pub fn timestamped_path(dir: &Path, prefix: &str, now: DateTime<Utc>) -> PathBuf {
    let stamp = now.format("%Y%m%dT%H%M%S%.3fZ").to_string();
    let mut candidate = dir.join(format!("{}-{}.db", prefix, stamp));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}-{}-{}.db", prefix, stamp, n));
        n += 1;
    }
    candidate
}

/// Copies `src` to `dst` and fsyncs the copy. Returns the bytes copied.
pub fn copy_with_fsync(src: &Path, dst: &Path) -> io::Result<u64> {
    let copied = fs::copy(src, dst)?;
    File::open(dst)?.sync_all()?;
    Ok(copied)
}

/// Removes a file; an already missing file is not an error
pub fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
