//! Parent/child hierarchy maintenance.
//!
//! A child-level record declares its parent through the related-dataset
//! reference. Linking is a read-modify-write against the store: fetch the
//! parent by id, merge the child's id into its child-reference list
//! idempotently, then write child and parent back as two separate
//! operations. The two writes are not atomic: two ingesters adding
//! different children of the same parent concurrently can lose one append.
//! That race is accepted and documented rather than silently fixed; closing
//! it requires an optimistic-concurrency token from the store.

use tracing::{info, warn};

use indexer_common::{CanonicalDocument, IndexerError, Result};
use storage::DocumentStore;

use crate::assembler::sanitize_identifier;

/// Outcome of linking a child document to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Child written and parent child-reference list updated.
    Linked,
    /// No parent document with the referenced id; nothing was written.
    ParentNotFound,
    /// More than one parent document matched; nothing was written.
    ParentAmbiguous,
}

/// Store-internal fields a fetched document carries that must be stripped
/// before it is rewritten: the version token, the full-text mirror and the
/// precomputed index-only bounding-box components.
const STORE_INTERNAL_FIELDS: &[&str] = &[
    "_version_",
    "full_text",
    "bbox__minX",
    "bbox__maxX",
    "bbox__minY",
    "bbox__maxY",
    "bbox_rpt",
    "ss_access",
];

/// Catalog URL prefixes some records use in their parent reference; the
/// bare identifier follows the prefix.
const CATALOG_URL_PREFIXES: &[&str] = &[
    "http://data.npolar.no/dataset/",
    "https://data.npolar.no/dataset/",
    "http://api.npolar.no/dataset/",
];

/// Resolve the child's declared parent reference to a store id.
pub fn parent_reference(child: &CanonicalDocument) -> Option<String> {
    let mut reference = child.str_value("related_dataset")?.to_string();
    for prefix in CATALOG_URL_PREFIXES {
        if let Some(stripped) = reference.strip_prefix(prefix) {
            reference = stripped.to_string();
        }
    }
    if let Some(stripped) = reference.strip_suffix(".xml") {
        reference = stripped.to_string();
    }
    Some(sanitize_identifier(&reference))
}

/// Link a child document to its parent and write both.
///
/// Zero or multiple parent matches skip the record (no writes) so the rest
/// of a batch can continue; store failures propagate unwrapped.
pub async fn link_child<S>(child: &CanonicalDocument, store: &S) -> Result<LinkOutcome>
where
    S: DocumentStore + ?Sized,
{
    let Some(child_id) = child.id().map(str::to_string) else {
        return Err(IndexerError::MissingIdentifier);
    };
    let Some(parent_id) = parent_reference(child) else {
        warn!(child = %child_id, "Child record carries no parent reference, skipping link");
        return Ok(LinkOutcome::ParentNotFound);
    };

    let mut matches = store.fetch_by_id(&parent_id).await?;
    match matches.len() {
        0 => {
            warn!(parent = %parent_id, "Did not find a unique parent record, skipping record");
            return Ok(LinkOutcome::ParentNotFound);
        }
        1 => {}
        n => {
            warn!(parent = %parent_id, matches = n, "Parent lookup is ambiguous, skipping record");
            return Ok(LinkOutcome::ParentAmbiguous);
        }
    }
    let mut parent = matches.remove(0);

    for field in STORE_INTERNAL_FIELDS {
        parent.remove(field);
    }
    parent.set_bool("isParent", true);

    // idempotent merge: the same child linked twice stays a single entry
    let mut references = parent.values("related_dataset");
    if !references.iter().any(|reference| reference == &child_id) {
        info!(child = %child_id, parent = %parent_id, "Adding child reference to parent");
        references.push(child_id.clone());
    }
    parent.set_multi("related_dataset", references);

    // child first, then parent; two separate writes, not atomic
    store.write(child).await?;
    store.write(&parent).await?;

    Ok(LinkOutcome::Linked)
}
