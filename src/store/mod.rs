//! Event storage: SQLite store, batch ingestion, retention

pub mod ingest;
pub mod retention;
pub mod sqlite;

pub use ingest::parse_event_batch;
pub use retention::{apply_retention, retention_task, RetentionRule};
pub use sqlite::{EventNameCount, SqliteEventStore};
