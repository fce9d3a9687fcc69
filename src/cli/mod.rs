//! CLI module for vaultdb
//!
//! Provides command-line interface for:
//! - init: Create the database file
//! - migrate: Apply schema-change scripts
//! - query / exec: One-shot SQL
//! - backup: Create, list, restore, delete and rotate snapshots
//! - clear-data: Delete business rows
//! - schedule: Run automatic backups until interrupted

mod args;
mod commands;
mod errors;
mod io;

pub use args::{BackupAction, Cli, Command};
pub use commands::{backup, clear_data, exec, init, migrate, query, run, run_command, schedule};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{parse_params, write_response};
