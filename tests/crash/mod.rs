//! Crash testing framework for vaultdb
//!
//! This module provides:
//! - A workspace with a config file and database
//! - Subprocess execution with `VAULTDB_CRASH_POINT` set
//! - Post-crash validation of the durable file

pub mod harness;
pub mod scenarios;

pub use harness::*;
