//! Loads schema-change scripts from the migrations directory
//!
//! - One `.sql` file per migration
//! - Applied in lexicographic filename order
//! - A missing directory means no migrations

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

use super::errors::{MigrationError, MigrationResult};

/// One `.sql` file from the migrations directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaChangeScript {
    pub filename: String,
    pub sql: String,
    /// SHA-256 of the file bytes, lowercase hex
    pub checksum: String,
}

impl SchemaChangeScript {
    pub fn new(filename: impl Into<String>, sql: impl Into<String>) -> Self {
        let sql = sql.into();
        let checksum = checksum(sql.as_bytes());
        Self {
            filename: filename.into(),
            sql,
            checksum,
        }
    }
}

/// SHA-256 of `bytes` as lowercase hex
pub fn checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Reads every `*.sql` file in `dir`, sorted by filename.
pub fn load_scripts(dir: &Path) -> MigrationResult<Vec<SchemaChangeScript>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| {
        MigrationError::io(
            format!("failed to read migrations directory {}", dir.display()),
            Some(Box::new(e)),
        )
    })?;

    let mut scripts = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| {
            MigrationError::io("failed to read directory entry", Some(Box::new(e)))
        })?;
        let path = entry.path();

        // Skip non-SQL files and subdirectories
        if !path.is_file() || path.extension().map_or(true, |ext| ext != "sql") {
            continue;
        }
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        let bytes = fs::read(&path).map_err(|e| {
            MigrationError::io(format!("failed to read {}", filename), Some(Box::new(e)))
        })?;
        let checksum = checksum(&bytes);
        let sql = String::from_utf8(bytes).map_err(|e| {
            MigrationError::io(format!("{} is not valid UTF-8", filename), Some(Box::new(e)))
        })?;

        scripts.push(SchemaChangeScript {
            filename: filename.to_string(),
            sql,
            checksum,
        });
    }

    scripts.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(scripts)
}
