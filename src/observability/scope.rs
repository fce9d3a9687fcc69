//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` on `complete()`
//! - Logs `{name}_FAILED` on `fail()`
//! - Logs `{name}_INCOMPLETE` on drop if neither was called

use std::cell::Cell;
use std::time::Instant;

use super::logger::{Logger, Severity};

/// A scope that logs the start and outcome of a long operation
///
/// ```ignore
/// let scope = ObservationScope::new("BACKUP");
/// // ... do work ...
/// scope.complete(); // logs BACKUP_COMPLETE with elapsed_ms
/// ```
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
    started: Instant,
}

impl<'a> ObservationScope<'a> {
    /// Create a new observation scope. Logs `{name}_BEGIN` at TRACE level.
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a new observation scope carrying fields into every event
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let event = format!("{}_BEGIN", name);
        Logger::trace(&event, fields);

        Self {
            name,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
            started: Instant::now(),
        }
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(self, extra_fields: &[(&str, &str)]) {
        self.finish(Severity::Info, "COMPLETE", extra_fields);
    }

    /// Mark the scope as failed with a reason. Logs at ERROR level.
    pub fn fail(self, reason: &str) {
        self.finish(Severity::Error, "FAILED", &[("reason", reason)]);
    }

    /// Mark the scope as failed with FATAL severity
    pub fn fail_fatal(self, reason: &str) {
        self.finish(Severity::Fatal, "FAILED", &[("reason", reason)]);
    }

    /// Check if the scope has been completed
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    fn finish(&self, severity: Severity, suffix: &str, extra_fields: &[(&str, &str)]) {
        self.completed.set(true);
        let event = format!("{}_{}", self.name, suffix);
        let elapsed = self.started.elapsed().as_millis().to_string();

        let mut all_fields: Vec<(&str, &str)> =
            self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all_fields.extend(extra_fields.iter().copied());
        all_fields.push(("elapsed_ms", elapsed.as_str()));

        Logger::log(severity, &event, &all_fields);
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            let event = format!("{}_INCOMPLETE", self.name);
            Logger::warn(&event, &[("reason", "scope dropped without completion")]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_creation() {
        let scope = ObservationScope::new("TEST");
        assert!(!scope.is_completed());
        scope.complete();
    }

    #[test]
    fn test_scope_with_fields() {
        let scope = ObservationScope::with_fields("TEST", &[("path", "/tmp/db.sqlite")]);
        scope.complete_with_fields(&[("bytes", "4096")]);
    }

    #[test]
    fn test_scope_fail() {
        let scope = ObservationScope::new("TEST");
        scope.fail("disk full");
    }

    #[test]
    fn test_scope_drop_without_complete() {
        let scope = ObservationScope::new("TEST");
        drop(scope);
    }
}
