//! Hierarchy linker tests against an in-memory store.

use std::sync::Mutex;

use async_trait::async_trait;

use indexer_common::{CanonicalDocument, FieldValue, Result};
use indexing::{link_child, LinkOutcome};
use storage::DocumentStore;

/// Minimal in-memory stand-in for the document store. Duplicate ids are
/// representable on purpose so the ambiguous-parent path can be exercised.
#[derive(Default)]
struct MemoryStore {
    docs: Mutex<Vec<CanonicalDocument>>,
}

impl MemoryStore {
    fn seed(docs: Vec<CanonicalDocument>) -> Self {
        Self {
            docs: Mutex::new(docs),
        }
    }

    fn get(&self, id: &str) -> Vec<CanonicalDocument> {
        self.docs
            .lock()
            .unwrap()
            .iter()
            .filter(|doc| doc.id() == Some(id))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn fetch_by_id(&self, id: &str) -> Result<Vec<CanonicalDocument>> {
        Ok(self.get(id))
    }

    async fn write(&self, doc: &CanonicalDocument) -> Result<()> {
        let mut docs = self.docs.lock().unwrap();
        docs.retain(|existing| existing.id() != doc.id());
        docs.push(doc.clone());
        Ok(())
    }
}

fn parent_doc(id: &str) -> CanonicalDocument {
    let mut doc = CanonicalDocument::new();
    doc.set_str("id", id);
    doc.set_str("dataset_type", "Level-1");
    doc.set_bool("isParent", false);
    // store-internal fields a real fetch carries
    doc.set_f64("_version_", 1729382256910270464.0);
    doc.set_str("full_text", "mirror");
    doc.set_f64("bbox__maxX", 20.0);
    doc
}

fn child_doc(id: &str, parent: &str) -> CanonicalDocument {
    let mut doc = CanonicalDocument::new();
    doc.set_str("id", id);
    doc.set_str("dataset_type", "Level-2");
    doc.set_bool("isChild", true);
    doc.set_str("related_dataset", parent.to_string());
    doc
}

#[tokio::test]
async fn test_link_writes_child_and_updates_parent() {
    let store = MemoryStore::seed(vec![parent_doc("no-met-parent")]);
    let child = child_doc("no-met-child-1", "no:met/parent");

    let outcome = link_child(&child, &store).await.unwrap();
    assert_eq!(outcome, LinkOutcome::Linked);

    let written_child = store.get("no-met-child-1");
    assert_eq!(written_child.len(), 1);

    let parent = &store.get("no-met-parent")[0];
    assert_eq!(parent.get("isParent"), Some(&FieldValue::Bool(true)));
    assert_eq!(parent.values("related_dataset"), vec!["no-met-child-1"]);
    // internal fields do not survive the rewrite
    assert!(!parent.contains("_version_"));
    assert!(!parent.contains("full_text"));
    assert!(!parent.contains("bbox__maxX"));
}

#[tokio::test]
async fn test_link_is_idempotent() {
    let store = MemoryStore::seed(vec![parent_doc("no-met-parent")]);
    let child = child_doc("no-met-child-1", "no:met/parent");

    assert_eq!(link_child(&child, &store).await.unwrap(), LinkOutcome::Linked);
    assert_eq!(link_child(&child, &store).await.unwrap(), LinkOutcome::Linked);

    let parent = &store.get("no-met-parent")[0];
    assert_eq!(parent.values("related_dataset"), vec!["no-met-child-1"]);
}

#[tokio::test]
async fn test_two_children_accumulate() {
    let store = MemoryStore::seed(vec![parent_doc("no-met-parent")]);
    let first = child_doc("no-met-child-1", "no:met/parent");
    let second = child_doc("no-met-child-2", "no:met/parent");

    link_child(&first, &store).await.unwrap();
    link_child(&second, &store).await.unwrap();

    let parent = &store.get("no-met-parent")[0];
    assert_eq!(
        parent.values("related_dataset"),
        vec!["no-met-child-1", "no-met-child-2"]
    );
}

#[tokio::test]
async fn test_parent_not_found_writes_nothing() {
    let store = MemoryStore::default();
    let child = child_doc("no-met-child-1", "no:met/parent");

    let outcome = link_child(&child, &store).await.unwrap();
    assert_eq!(outcome, LinkOutcome::ParentNotFound);
    assert!(store.get("no-met-child-1").is_empty());
}

#[tokio::test]
async fn test_ambiguous_parent_writes_nothing() {
    let store = MemoryStore::seed(vec![
        parent_doc("no-met-parent"),
        parent_doc("no-met-parent"),
    ]);
    let child = child_doc("no-met-child-1", "no:met/parent");

    let outcome = link_child(&child, &store).await.unwrap();
    assert_eq!(outcome, LinkOutcome::ParentAmbiguous);
    assert!(store.get("no-met-child-1").is_empty());
}
