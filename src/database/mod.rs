/*!
 * Database module for persistent storage of translation jobs.
 *
 * This module provides SQLite-based persistence for:
 * - Job records (status, progress, translation result, token usage)
 * - Per-job log lines with structured metadata
 */

pub mod schema;
pub mod connection;
pub mod repository;
pub mod models;
pub mod store;

// Re-export main types
pub use connection::DatabaseConnection;
pub use models::{JobLogLevel, JobLogRecord, JobRecord, JobStats, JobStatus, JobUpdate};
pub use repository::Repository;
pub use store::JobStore;
