//! Validation of freshly written snapshot files

use std::path::Path;

use super::errors::{BackupError, BackupResult};
use crate::storage::verify_image;

/// Checks that a snapshot exists, is at least one SQLite page long and
/// starts with the SQLite header. Returns its size.
pub fn validate_backup_file(path: &Path) -> BackupResult<u64> {
    verify_image(path).map_err(|defect| {
        BackupError::validation(format!(
            "backup {} is invalid: {}",
            path.display(),
            defect
        ))
    })
}
