//! CLI command implementations
//!
//! Every command loads the configuration, opens the database (which
//! initializes it), does its work, and prints one JSON object.

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value as JsonValue};

use crate::backup::{AutoBackupScheduler, BackupManager};
use crate::config::VaultConfig;
use crate::migration::{applied_migrations, Migrator};
use crate::settings::{load_auto_backup_config, save_auto_backup_config};
use crate::storage::Database;

use super::args::{BackupAction, Command};
use super::errors::{CliError, CliResult};
use super::io::{parse_params, write_response};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let output = match cmd {
        Command::Init { config } => init(&config)?,
        Command::Migrate { config } => migrate(&config)?,
        Command::Query {
            config,
            sql,
            params,
        } => query(&config, &sql, params.as_deref())?,
        Command::Exec {
            config,
            sql,
            params,
        } => exec(&config, &sql, params.as_deref())?,
        Command::Backup { config, action } => backup(&config, action)?,
        Command::ClearData { config, yes } => clear_data(&config, yes)?,
        Command::Schedule {
            config,
            enable,
            disable,
            interval_hours,
        } => schedule(&config, enable, disable, interval_hours)?,
    };
    write_response(output)
}

fn open(config_path: &Path) -> CliResult<(VaultConfig, Database)> {
    let config = VaultConfig::load(config_path)?;
    let db = Database::open(&config.database_path)?;
    Ok((config, db))
}

/// Create the database file and its migrations table
pub fn init(config_path: &Path) -> CliResult<JsonValue> {
    let (config, db) = open(config_path)?;
    Ok(json!({
        "database": config.database_path,
        "bytes": db.image_bytes()?,
    }))
}

/// Apply pending schema-change scripts
pub fn migrate(config_path: &Path) -> CliResult<JsonValue> {
    let (config, mut db) = open(config_path)?;
    let report = Migrator::new(&config.migrations_dir).run(&mut db)?;
    let applied = applied_migrations(&db)?;
    Ok(json!({
        "run": report,
        "applied_total": applied.len(),
    }))
}

/// Run a read-only statement
pub fn query(config_path: &Path, sql: &str, params: Option<&str>) -> CliResult<JsonValue> {
    let params = parse_params(params)?;
    let (_, db) = open(config_path)?;
    let rows = db.query(sql, &params)?;
    Ok(JsonValue::Array(rows.iter().map(|r| r.to_json()).collect()))
}

/// Run a mutating statement
pub fn exec(config_path: &Path, sql: &str, params: Option<&str>) -> CliResult<JsonValue> {
    let params = parse_params(params)?;
    let (_, mut db) = open(config_path)?;
    let outcome = db.execute(sql, &params)?;
    Ok(serde_json::to_value(outcome)?)
}

pub fn backup(config_path: &Path, action: BackupAction) -> CliResult<JsonValue> {
    let (config, mut db) = open(config_path)?;
    let manager = BackupManager::from_config(&config);

    let output = match action {
        BackupAction::Create => serde_json::to_value(manager.create_backup(&mut db)?)?,
        BackupAction::List => serde_json::to_value(manager.list_backups(&mut db)?)?,
        BackupAction::Restore { id } => serde_json::to_value(manager.restore_backup(&mut db, id)?)?,
        BackupAction::Delete { id } => serde_json::to_value(manager.delete_backup(&mut db, id)?)?,
        BackupAction::Rotate => json!({ "removed": manager.rotate_backups(&mut db) }),
    };
    Ok(output)
}

pub fn clear_data(config_path: &Path, yes: bool) -> CliResult<JsonValue> {
    if !yes {
        return Err(CliError::not_confirmed("clear-data"));
    }
    let (config, mut db) = open(config_path)?;
    let cleared = BackupManager::from_config(&config).clear_all_data(&mut db)?;
    Ok(json!({ "cleared": cleared }))
}

/// Run the auto-backup scheduler until Ctrl-C
pub fn schedule(
    config_path: &Path,
    enable: bool,
    disable: bool,
    interval_hours: Option<f64>,
) -> CliResult<JsonValue> {
    let (config, mut db) = open(config_path)?;

    if enable || disable || interval_hours.is_some() {
        let mut schedule = load_auto_backup_config(&db)?;
        if enable {
            schedule.enabled = true;
        }
        if disable {
            schedule.enabled = false;
        }
        if let Some(hours) = interval_hours {
            schedule.interval_hours = hours;
        }
        save_auto_backup_config(&mut db, &schedule)?;
    }

    let manager = BackupManager::from_config(&config);
    let db = Arc::new(Mutex::new(db));

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::io_error(format!("Failed to create tokio runtime: {}", e)))?;

    rt.block_on(async {
        let scheduler = AutoBackupScheduler::start(db, manager, config.startup_check_delay());
        let signal = tokio::signal::ctrl_c().await;
        scheduler.shutdown().await;
        signal.map_err(|e| CliError::io_error(format!("Failed to wait for Ctrl-C: {}", e)))
    })?;

    Ok(json!({ "stopped": true }))
}
