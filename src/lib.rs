//! vaultdb - Embedded SQLite persistence for a single-process application
//!
//! In-memory SQLite instance with write-through saves to one durable file,
//! forward-only schema migrations, and catalogued backup snapshots.

pub mod backup;
pub mod cli;
pub mod config;
pub mod crash_point;
pub mod error;
pub mod migration;
pub mod observability;
pub mod restore;
pub mod settings;
pub mod storage;

pub use error::{Severity, VaultError, VaultResult};
