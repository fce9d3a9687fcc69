//! CLI argument definitions using clap
//!
//! Commands:
//! - vaultdb init --config <path>
//! - vaultdb migrate --config <path>
//! - vaultdb query --config <path> <sql> [--params <json array>]
//! - vaultdb exec --config <path> <sql> [--params <json array>]
//! - vaultdb backup --config <path> create|list|restore|delete|rotate
//! - vaultdb clear-data --config <path> --yes
//! - vaultdb schedule --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// vaultdb - Embedded SQLite persistence with migrations and backups
#[derive(Parser, Debug)]
#[command(name = "vaultdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database file and the migrations table
    Init {
        /// Path to configuration file
        #[arg(long, default_value = "./vaultdb.json")]
        config: PathBuf,
    },

    /// Apply pending schema-change scripts
    Migrate {
        /// Path to configuration file
        #[arg(long, default_value = "./vaultdb.json")]
        config: PathBuf,
    },

    /// Run a read-only statement and print the rows
    Query {
        /// Path to configuration file
        #[arg(long, default_value = "./vaultdb.json")]
        config: PathBuf,

        sql: String,

        /// Positional parameters as a JSON array
        #[arg(long)]
        params: Option<String>,
    },

    /// Run a mutating statement and persist the result
    Exec {
        /// Path to configuration file
        #[arg(long, default_value = "./vaultdb.json")]
        config: PathBuf,

        sql: String,

        /// Positional parameters as a JSON array
        #[arg(long)]
        params: Option<String>,
    },

    /// Manage backup snapshots
    Backup {
        /// Path to configuration file
        #[arg(long, default_value = "./vaultdb.json")]
        config: PathBuf,

        #[command(subcommand)]
        action: BackupAction,
    },

    /// Delete every business row, keeping migrations, backups and settings
    ClearData {
        /// Path to configuration file
        #[arg(long, default_value = "./vaultdb.json")]
        config: PathBuf,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Run the auto-backup scheduler until Ctrl-C
    Schedule {
        /// Path to configuration file
        #[arg(long, default_value = "./vaultdb.json")]
        config: PathBuf,

        /// Enable automatic backups before starting
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Disable automatic backups before starting
        #[arg(long)]
        disable: bool,

        /// Store a new backup interval before starting
        #[arg(long)]
        interval_hours: Option<f64>,
    },
}

#[derive(Subcommand, Debug)]
pub enum BackupAction {
    /// Snapshot the persisted database
    Create,
    /// List catalogued snapshots, newest first
    List,
    /// Replace the live database with a snapshot
    Restore { id: i64 },
    /// Delete a snapshot and its catalogue entry
    Delete { id: i64 },
    /// Apply the retention limit
    Rotate,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
