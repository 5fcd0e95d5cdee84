//! Narrow read/write interface over the document store.

use async_trait::async_trait;

use indexer_common::{CanonicalDocument, Result};

/// The interface the hierarchy linker's read-modify-write runs through.
///
/// Kept narrow so the core stays testable without a live store.
/// Implementations do not retry: a failed read or write surfaces as
/// `StoreRead`/`StoreWrite` unwrapped.
#[async_trait]
pub trait DocumentStore {
    /// Fetch every document whose id equals `id`. The store does not
    /// enforce uniqueness here; the caller decides what multiple matches
    /// mean.
    async fn fetch_by_id(&self, id: &str) -> Result<Vec<CanonicalDocument>>;

    /// Write one document, replacing any existing document with the same
    /// id.
    async fn write(&self, doc: &CanonicalDocument) -> Result<()>;
}
