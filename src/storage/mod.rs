//! Storage subsystem for vaultdb
//!
//! The whole database lives in memory as one SQLite instance and is
//! persisted as a single image file. Every successful mutation rewrites
//! the image through the atomic write protocol in `writer`.
//!
//! # Guarantees
//!
//! - Write-through: `execute()` and transactions return only after the save
//! - The durable file is replaced by rename, never truncated in place
//! - `<path>.backup` holds the previous durable state
//! - A failed save keeps the live instance so the operation can be retried

mod database;
mod errors;
mod image;
mod row;
mod schema;
mod writer;

pub use database::{Database, DbState, TxContext};
pub use errors::{StorageError, StorageErrorCode, StorageResult};
pub use image::{verify_image, ImageDefect, MIN_IMAGE_SIZE, SQLITE_HEADER};
pub use row::{ExecuteOutcome, Row, Statement};
pub use rusqlite::types::Value;
pub use schema::MIGRATIONS_TABLE;
pub use writer::{ImageWriter, SaveReport};
