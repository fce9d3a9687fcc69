//! Migration subsystem for vaultdb
//!
//! Forward-only schema upgrades from `.sql` files. Each script runs in its
//! own `BEGIN IMMEDIATE` transaction together with the insert of its
//! migration record, so a script is either fully applied and recorded or
//! not applied at all.
//!
//! Checksums are recorded when a script is applied. Editing a script after
//! that is not detected.

mod classify;
mod engine;
mod errors;
mod loader;
mod splitter;

pub use classify::is_already_exists;
pub use engine::{applied_migrations, MigrationRecord, MigrationReport, Migrator};
pub use errors::{MigrationError, MigrationErrorCode, MigrationResult};
pub use loader::{checksum, load_scripts, SchemaChangeScript};
pub use splitter::{split_statements, strip_comments};
