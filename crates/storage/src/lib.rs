//! Document store access for the dataset indexer.
//!
//! One flat document per dataset, keyed by the sanitized identifier. The
//! store is an external shared resource: all operations are synchronous
//! from the core's point of view, carry no retry, and surface transport
//! failures to the caller verbatim.

mod solr;
mod store;

pub use solr::{SolrClient, SolrConfig};
pub use store::DocumentStore;
