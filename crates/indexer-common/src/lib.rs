//! Shared types for the dataset metadata indexer.
//!
//! Holds what every other crate in the workspace needs:
//!
//! - Error taxonomy and `Result` alias
//! - The flat canonical document written to the search index
//! - Geographic extent and derived search geometries
//! - Timestamp normalization helpers

pub mod document;
pub mod error;
pub mod extent;
pub mod time;

// Re-exports
pub use document::{CanonicalDocument, FieldValue};
pub use error::{IndexerError, Result};
pub use extent::GeographicExtent;
