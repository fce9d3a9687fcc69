//! "Already exists" classification
//!
//! A statement that fails only because its object is already in place
//! (table, index, view, trigger, column) is skipped instead of aborting the
//! script. This lets scripts written without `IF NOT EXISTS` run against a
//! database that already has part of their schema.

use rusqlite::ffi;

/// Whether `err` reports an object that already exists.
///
/// Only generic `SQLITE_ERROR` failures qualify; constraint violations and
/// I/O errors never do, whatever their message says.
pub fn is_already_exists(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            if failure.extended_code & 0xff != ffi::SQLITE_ERROR {
                return false;
            }
            message.as_deref().map_or(false, is_already_exists_message)
        }
        _ => false,
    }
}

fn is_already_exists_message(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.starts_with("duplicate column name")
        || (message.ends_with("already exists")
            && ["table", "index", "view", "trigger"]
                .iter()
                .any(|kind| message.starts_with(kind)))
}
