//! Error types for the indexer workspace.

use thiserror::Error;

/// Result type alias using IndexerError.
pub type Result<T> = std::result::Result<T, IndexerError>;

/// Errors that can occur while transforming and indexing metadata records.
///
/// Field-level anomalies (missing required element, vocabulary violation,
/// unparseable date) are not errors: they are recovered in place with a
/// default and a warning. Only record-level and store-level failures
/// surface here.
#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("Missing spatial bounds in record: {0}")]
    MissingSpatialBounds(String),

    #[error("Parent dataset not found: {0}")]
    ParentNotFound(String),

    #[error("Parent lookup for '{id}' matched {matches} documents, expected exactly one")]
    ParentAmbiguous { id: String, matches: usize },

    #[error("Document has no identifier")]
    MissingIdentifier,

    #[error("Invalid dataset level: {0} (expected 1 or 2)")]
    InvalidLevel(u8),

    #[error("Failed to parse metadata document: {0}")]
    XmlParse(String),

    #[error("Store read failed: {0}")]
    StoreRead(String),

    #[error("Store write failed: {0}")]
    StoreWrite(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),
}
