//! Atomic image writer
//!
//! Every durable mutation rewrites the whole image through this protocol:
//!
//! 1. Write the serialized image to `<path>.tmp` and fsync it
//! 2. Verify the temp file exists and holds exactly the image byte count
//! 3. Copy the current durable file (if any) to `<path>.backup.tmp`, fsync
//!    it and rename it over `<path>.backup`
//! 4. Rename `<path>.tmp` over `<path>` and fsync the parent directory
//! 5. Read `<path>` back and verify size and header
//!
//! Until step 4 completes the previous durable file is untouched; after it
//! the new file is complete. The durable file is never observably
//! truncated.
//!
//! # Platform precondition
//!
//! Step 4 relies on `rename(2)` replacing the target atomically. This holds
//! on local POSIX filesystems and NTFS. Behavior on volumes without atomic
//! rename (some network mounts) is unspecified.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, DatabaseName};

use super::errors::{StorageError, StorageResult};
use super::image::{read_back, ImageDefect};
use crate::crash_point::{maybe_crash, points};

/// Outcome of one successful save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveReport {
    /// Size of the durable image in bytes
    pub bytes: u64,
    /// Whether a previous durable file was copied to the `.backup` companion
    pub previous_backed_up: bool,
}

/// Writes the live instance to its durable path
#[derive(Debug, Clone)]
pub struct ImageWriter {
    path: PathBuf,
    temp_path: PathBuf,
    backup_path: PathBuf,
    backup_temp_path: PathBuf,
}

impl ImageWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let temp_path = companion(&path, "tmp");
        let backup_path = companion(&path, "backup");
        let backup_temp_path = companion(&path, "backup.tmp");
        Self {
            path,
            temp_path,
            backup_path,
            backup_temp_path,
        }
    }

    /// The durable image path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<path>.tmp`, present only while a save is in flight
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    /// `<path>.backup`, the previous durable state
    pub fn backup_path(&self) -> &Path {
        &self.backup_path
    }

    /// Removes a temp image left behind by an interrupted save.
    ///
    /// Returns true if one was found.
    pub fn remove_stale_temp(&self) -> io::Result<bool> {
        match fs::remove_file(&self.temp_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Runs the atomic write protocol for the main database of `conn`.
    pub fn write(&self, conn: &Connection) -> StorageResult<SaveReport> {
        let expected = image_size(conn)?;

        // Step 1: write the image to the temp path
        self.remove_stale_temp()
            .map_err(|e| persistence("remove stale temp image", e))?;
        conn.backup(DatabaseName::Main, &self.temp_path, None)
            .map_err(|e| StorageError::persistence("write temp image", Some(Box::new(e))))?;
        fsync_file(&self.temp_path).map_err(|e| persistence("fsync temp image", e))?;
        maybe_crash(points::SAVE_AFTER_TEMP_WRITE);

        // Step 2: verify the temp file
        let written = fs::metadata(&self.temp_path)
            .map_err(|e| persistence("stat temp image", e))?
            .len();
        if written != expected {
            let _ = fs::remove_file(&self.temp_path);
            return Err(StorageError::persistence(
                "verify temp image",
                Some(Box::new(ImageDefect::SizeMismatch {
                    size: written,
                    expected,
                })),
            ));
        }

        // Step 3: keep the previous durable state
        let previous_backed_up = if self.path.exists() {
            self.replace_backup()
                .map_err(|e| persistence("copy previous image to backup", e))?;
            true
        } else {
            false
        };
        maybe_crash(points::SAVE_BEFORE_RENAME);

        // Step 4: atomic replace
        fs::rename(&self.temp_path, &self.path)
            .map_err(|e| persistence("rename temp image over durable image", e))?;
        if let Some(parent) = self.path.parent() {
            fsync_dir(parent).map_err(|e| persistence("fsync image directory", e))?;
        }
        maybe_crash(points::SAVE_AFTER_RENAME);

        // Step 5: read back
        read_back(&self.path, expected).map_err(|e| {
            StorageError::persistence("read back durable image", Some(Box::new(e)))
        })?;

        Ok(SaveReport {
            bytes: expected,
            previous_backed_up,
        })
    }
}

impl ImageWriter {
    /// `<path>.backup` is only ever replaced by rename, so it holds either
    /// the old or the new previous state in full.
    fn replace_backup(&self) -> io::Result<()> {
        fs::copy(&self.path, &self.backup_temp_path)?;
        fsync_file(&self.backup_temp_path)?;
        maybe_crash(points::SAVE_BEFORE_BACKUP_RENAME);
        fs::rename(&self.backup_temp_path, &self.backup_path)
    }
}

/// Byte size of the serialized main database: `page_count * page_size`
pub fn image_size(conn: &Connection) -> StorageResult<u64> {
    let pragma = |name: &str| -> StorageResult<u64> {
        let sql = format!("PRAGMA {}", name);
        conn.query_row(&sql, [], |row| row.get::<_, i64>(0))
            .map(|v| v as u64)
            .map_err(|e| StorageError::persistence("measure image", Some(Box::new(e))))
    };
    Ok(pragma("page_count")? * pragma("page_size")?)
}

fn companion(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

fn persistence(step: &str, err: io::Error) -> StorageError {
    StorageError::persistence(step, Some(Box::new(err)))
}

fn fsync_file(path: &Path) -> io::Result<()> {
    File::open(path)?.sync_all()
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) -> io::Result<()> {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}
