//! Observability for vaultdb
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Scope-based begin/complete logging
//!
//! Observability is read-only: nothing here changes execution, and a failed
//! log write is ignored.
//!
//! ```ignore
//! use vaultdb::observability::{log_event_with_fields, Event, ObservationScope};
//!
//! log_event_with_fields(Event::DbOpen, &[("path", "/data/app.db")]);
//!
//! let scope = ObservationScope::new("BACKUP");
//! // ... do work ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity, LOG_LEVEL_ENV};
pub use scope::ObservationScope;

fn severity_for(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_error() {
        Severity::Error
    } else if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(severity_for(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_for(event), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_for_event() {
        assert_eq!(severity_for(Event::MigrationFailed), Severity::Fatal);
        assert_eq!(severity_for(Event::DbSaveFailed), Severity::Error);
        assert_eq!(severity_for(Event::BackupPruned), Severity::Warn);
        assert_eq!(severity_for(Event::DbSave), Severity::Info);
    }

    #[test]
    fn test_log_event() {
        log_event(Event::SchedulerStopped);
        log_event_with_fields(Event::ConfigLoaded, &[("path", "/tmp/vaultdb.json")]);
    }
}
