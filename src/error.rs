//! Error taxonomy
//!
//! - `ConfigError`: build-time mistakes in view, data-source, mutator or widget
//!   declarations. Always returned to the caller constructing the pipeline.
//! - `FetchError`: transport/store failures. Swallowed at the cache boundary
//!   and surfaced only as a source that never resolves.
//! - `StoreError`: SQLite event store failures.
//! - `IngestError`: rejected batched event submissions.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unsupported mutator operation: {0}")]
    UnsupportedMutator(String),

    #[error("Mutator '{0}' requires a numeric 'value'")]
    MissingMutatorValue(String),

    #[error("Unknown aggregation: {0}")]
    UnknownAggregation(String),

    #[error("Malformed data source declaration: {0}")]
    MalformedDataSource(String),

    #[error("Duplicate data source id: {0}")]
    DuplicateDataSource(String),

    #[error("Widget '{widget}' references unknown data source '{source_id}'")]
    UnknownDataSource { widget: String, source_id: String },

    #[error("Widget '{widget}' expects {expected} data source(s), got {actual}")]
    DependencyCount {
        widget: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate widget id: {0}")]
    DuplicateWidget(String),

    #[error("Unknown widget: {0}")]
    UnknownWidget(String),

    #[error("View not found: {0}")]
    UnknownView(String),

    #[error("Invalid view file: {0}")]
    InvalidView(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid stored timestamp: {0}")]
    Timestamp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Event API returned status {0}")]
    Status(u16),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Rejections of a batched event submission
#[derive(Debug, Error, PartialEq)]
pub enum IngestError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing 'events' field in request body")]
    MissingEvents,

    #[error("'events' field must be an array")]
    EventsNotArray,

    #[error("Events array cannot be empty")]
    EmptyBatch,

    #[error("Event at index {0} must be an object")]
    EventNotObject(usize),

    #[error("Event at index {0} missing required 'name' field (string)")]
    MissingName(usize),

    #[error("Event at index {0} 'value' field must be a number")]
    InvalidValue(usize),

    #[error("Event at index {0} 'tag' field must be a string if provided")]
    InvalidTag(usize),

    #[error("Event at index {0} 'additional_info' field must be a string if provided")]
    InvalidAdditionalInfo(usize),

    #[error("Event at index {0} invalid timestamp format. Use ISO format (e.g., '2025-01-01T12:00:00Z')")]
    InvalidTimestamp(usize),
}
