//! Restore subsystem for vaultdb
//!
//! Restore replaces the live database with a catalogued snapshot while the
//! process keeps running.
//!
//! # Important
//!
//! Restore always writes an emergency copy of the state it replaces.
//! Restore reloads the live instance; no other handle may hold the file.
//! Restore does NOT run migrations on the restored image.

mod errors;
mod restorer;

pub use errors::{RestoreError, RestoreErrorCode, RestoreResult};
pub use restorer::{restore_backup, RestoreReport};
