//! Crash point injection for durability testing
//!
//! When `VAULTDB_CRASH_POINT` names a point that execution reaches, the
//! process terminates immediately via `std::process::abort()`: no cleanup,
//! no unwinding, no catching. Integration tests use this to kill a real
//! process in the middle of the atomic write protocol, a backup or a restore
//! and then check what is left on disk.
//!
//! ```bash
//! VAULTDB_CRASH_POINT=save_before_rename vaultdb exec "INSERT ..."
//! ```

use std::sync::OnceLock;

/// Environment variable naming the active crash point
pub const CRASH_POINT_ENV: &str = "VAULTDB_CRASH_POINT";

static CRASH_POINT: OnceLock<Option<String>> = OnceLock::new();

#[inline]
fn get_crash_point() -> Option<&'static str> {
    CRASH_POINT
        .get_or_init(|| std::env::var(CRASH_POINT_ENV).ok())
        .as_deref()
}

/// Returns true if `VAULTDB_CRASH_POINT` equals the given name.
#[inline]
pub fn crash_point_enabled(name: &str) -> bool {
    get_crash_point().map(|p| p == name).unwrap_or(false)
}

/// Abort the process if the named crash point is enabled.
///
/// No-op when `VAULTDB_CRASH_POINT` is unset or names another point.
#[inline]
pub fn maybe_crash(name: &str) {
    if crash_point_enabled(name) {
        eprintln!("[CRASH] Triggering crash at point: {}", name);
        std::process::abort();
    }
}

/// All defined crash point names
pub mod points {
    // Atomic write protocol
    pub const SAVE_AFTER_TEMP_WRITE: &str = "save_after_temp_write";
    pub const SAVE_BEFORE_BACKUP_RENAME: &str = "save_before_backup_rename";
    pub const SAVE_BEFORE_RENAME: &str = "save_before_rename";
    pub const SAVE_AFTER_RENAME: &str = "save_after_rename";

    // Migrations
    pub const MIGRATION_BEFORE_COMMIT: &str = "migration_before_commit";

    // Backups
    pub const BACKUP_AFTER_COPY: &str = "backup_after_copy";

    // Restore
    pub const RESTORE_AFTER_EMERGENCY_COPY: &str = "restore_after_emergency_copy";
    pub const RESTORE_AFTER_COPY_OVER: &str = "restore_after_copy_over";

    /// Get all crash point names
    pub fn all() -> &'static [&'static str] {
        &[
            SAVE_AFTER_TEMP_WRITE,
            SAVE_BEFORE_BACKUP_RENAME,
            SAVE_BEFORE_RENAME,
            SAVE_AFTER_RENAME,
            MIGRATION_BEFORE_COMMIT,
            BACKUP_AFTER_COPY,
            RESTORE_AFTER_EMERGENCY_COPY,
            RESTORE_AFTER_COPY_OVER,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crash_point_disabled_by_default() {
        assert!(!crash_point_enabled("test_point"));
    }

    #[test]
    fn test_all_crash_points_defined() {
        let all = points::all();
        assert_eq!(all.len(), 8);
        assert!(all.contains(&"save_before_rename"));
        assert!(all.contains(&"restore_after_copy_over"));
    }

    #[test]
    fn test_crash_point_names_are_lowercase_with_underscores() {
        for point in points::all() {
            assert!(
                point.chars().all(|c| c.is_lowercase() || c == '_'),
                "Crash point '{}' should be lowercase with underscores",
                point
            );
        }
    }
}
