//! Automatic backups on a timer
//!
//! The scheduler owns one tokio task with two triggers:
//!
//! - a one-shot check `startup_delay` after start, which backs up only if
//!   the last recorded backup is at least one interval old
//! - a recurring tick every interval, which always backs up
//!
//! The schedule is read from the settings table on every trigger, so
//! enabling or disabling takes effect without a restart. The tick period is
//! fixed when the scheduler starts and never shorter than one second.
//! Each backup runs on the blocking pool. Failures are logged, never
//! propagated.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::{self, JoinError, JoinHandle};
use tokio::time::{self, Instant, MissedTickBehavior};

use super::manager::BackupManager;
use crate::observability::{log_event_with_fields, Event};
use crate::settings::{load_auto_backup_config, AutoBackupConfig};
use crate::storage::Database;

/// Bounds for the tick period
const MIN_PERIOD: Duration = Duration::from_secs(1);
const MAX_PERIOD: Duration = Duration::from_secs(10 * 365 * 24 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Startup,
    Interval,
}

impl Trigger {
    fn as_str(&self) -> &'static str {
        match self {
            Trigger::Startup => "startup",
            Trigger::Interval => "interval",
        }
    }
}

/// Handle to the running auto-backup task
pub struct AutoBackupScheduler {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl AutoBackupScheduler {
    /// Spawns the scheduler task on the current tokio runtime.
    pub fn start(db: Arc<Mutex<Database>>, manager: BackupManager, startup_delay: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(run(db, manager, startup_delay, shutdown_rx));
        Self {
            shutdown_tx,
            handle,
        }
    }

    /// Stops the task and waits for it to finish. A backup in progress
    /// completes first.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            log_aborted(&e);
        }
    }
}

fn log_aborted(err: &JoinError) {
    let reason = err.to_string();
    log_event_with_fields(Event::SchedulerAborted, &[("reason", &reason)]);
}

async fn run(
    db: Arc<Mutex<Database>>,
    manager: BackupManager,
    startup_delay: Duration,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let initial = read_schedule(&db).unwrap_or_default();
    let period = initial.interval().clamp(MIN_PERIOD, MAX_PERIOD);

    let enabled = initial.enabled.to_string();
    let hours = initial.interval_hours.to_string();
    let delay = startup_delay.as_secs().to_string();
    log_event_with_fields(
        Event::SchedulerStarted,
        &[
            ("enabled", &enabled),
            ("interval_hours", &hours),
            ("startup_delay_secs", &delay),
        ],
    );

    let startup = time::sleep(startup_delay);
    tokio::pin!(startup);
    let mut startup_pending = true;

    let mut ticker = time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = &mut startup, if startup_pending => {
                startup_pending = false;
                attempt_blocking(&db, &manager, Trigger::Startup).await;
            }

            _ = ticker.tick() => {
                attempt_blocking(&db, &manager, Trigger::Interval).await;
            }

            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    log_event_with_fields(Event::SchedulerStopped, &[]);
}

fn read_schedule(db: &Mutex<Database>) -> Option<AutoBackupConfig> {
    let guard = db.lock().unwrap_or_else(PoisonError::into_inner);
    match load_auto_backup_config(&guard) {
        Ok(config) => Some(config),
        Err(e) => {
            let reason = e.to_string();
            log_event_with_fields(Event::SchedulerBackupFailed, &[("reason", &reason)]);
            None
        }
    }
}

async fn attempt_blocking(db: &Arc<Mutex<Database>>, manager: &BackupManager, trigger: Trigger) {
    let db = Arc::clone(db);
    let manager = manager.clone();
    if let Err(e) = task::spawn_blocking(move || attempt(&db, &manager, trigger)).await {
        log_aborted(&e);
    }
}

fn attempt(db: &Mutex<Database>, manager: &BackupManager, trigger: Trigger) {
    let mut guard = db.lock().unwrap_or_else(PoisonError::into_inner);

    let config = match load_auto_backup_config(&guard) {
        Ok(config) => config,
        Err(e) => {
            let reason = e.to_string();
            log_event_with_fields(
                Event::SchedulerBackupFailed,
                &[("trigger", trigger.as_str()), ("reason", &reason)],
            );
            return;
        }
    };

    if !config.enabled {
        log_event_with_fields(
            Event::SchedulerSkipped,
            &[("trigger", trigger.as_str()), ("reason", "disabled")],
        );
        return;
    }

    if trigger == Trigger::Startup && !config.is_due(Utc::now()) {
        log_event_with_fields(
            Event::SchedulerSkipped,
            &[("trigger", trigger.as_str()), ("reason", "not_due")],
        );
        return;
    }

    if let Err(e) = manager.create_backup(&mut guard) {
        let reason = e.to_string();
        log_event_with_fields(
            Event::SchedulerBackupFailed,
            &[("trigger", trigger.as_str()), ("reason", &reason)],
        );
    }
}
