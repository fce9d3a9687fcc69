//! Crash scenarios, one file per subsystem

mod backup;
mod migration;
mod restore;
mod save;
