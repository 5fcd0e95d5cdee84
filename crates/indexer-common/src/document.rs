//! The flat canonical document written to the search index.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single field value in a canonical document.
///
/// Index fields are either scalar or multi-valued. Numbers and booleans
/// keep their JSON type so range queries work on the index side; anything
/// else a fetched document carries is kept verbatim so a read-modify-write
/// does not lose fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Float(f64),
    Bool(bool),
    Strs(Vec<String>),
    Other(serde_json::Value),
}

/// A flat mapping from field name to scalar or multi-valued content.
///
/// Multi-valued field families that share a qualifier are index-aligned:
/// position `i` across the family describes the same sub-entity. That
/// invariant is enforced by the flattener that builds the families, not by
/// the map itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalDocument {
    fields: BTreeMap<String, FieldValue>,
}

impl CanonicalDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store's primary key (the sanitized identifier), when set.
    pub fn id(&self) -> Option<&str> {
        self.str_value("id")
    }

    pub fn set_str(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), FieldValue::Str(value.into()));
    }

    pub fn set_f64(&mut self, name: impl Into<String>, value: f64) {
        self.fields.insert(name.into(), FieldValue::Float(value));
    }

    pub fn set_bool(&mut self, name: impl Into<String>, value: bool) {
        self.fields.insert(name.into(), FieldValue::Bool(value));
    }

    pub fn set_multi(&mut self, name: impl Into<String>, values: Vec<String>) {
        self.fields.insert(name.into(), FieldValue::Strs(values));
    }

    /// Append to a multi-valued field, creating it if needed. A scalar
    /// already stored under the name is promoted to a one-element list
    /// first.
    pub fn push(&mut self, name: &str, value: impl Into<String>) {
        match self.fields.get_mut(name) {
            Some(FieldValue::Strs(values)) => values.push(value.into()),
            Some(FieldValue::Str(existing)) => {
                let promoted = vec![std::mem::take(existing), value.into()];
                self.fields.insert(name.to_string(), FieldValue::Strs(promoted));
            }
            _ => {
                self.fields
                    .insert(name.to_string(), FieldValue::Strs(vec![value.into()]));
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Scalar string view of a field.
    pub fn str_value(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Str(value)) => Some(value),
            _ => None,
        }
    }

    /// Multi-valued view of a field.
    pub fn multi(&self, name: &str) -> Option<&[String]> {
        match self.fields.get(name) {
            Some(FieldValue::Strs(values)) => Some(values),
            _ => None,
        }
    }

    /// Uniform list view of a field regardless of stored shape: absent
    /// yields an empty list, a scalar yields one element.
    pub fn values(&self, name: &str) -> Vec<String> {
        match self.fields.get(name) {
            Some(FieldValue::Str(value)) => vec![value.clone()],
            Some(FieldValue::Strs(values)) => values.clone(),
            _ => Vec::new(),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.fields.remove(name)
    }

    /// Drop empty multi-valued fields before handing the document to the
    /// store; the index treats an absent field and an empty list the same.
    pub fn prune_empty(&mut self) {
        self.fields
            .retain(|_, value| !matches!(value, FieldValue::Strs(values) if values.is_empty()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_creates_and_appends() {
        let mut doc = CanonicalDocument::new();
        doc.push("collection", "ADC");
        doc.push("collection", "NSDN");
        assert_eq!(doc.multi("collection"), Some(&["ADC".to_string(), "NSDN".to_string()][..]));
    }

    #[test]
    fn test_push_promotes_scalar() {
        let mut doc = CanonicalDocument::new();
        doc.set_str("related_dataset", "a-b-c");
        doc.push("related_dataset", "d-e-f");
        assert_eq!(doc.values("related_dataset"), vec!["a-b-c", "d-e-f"]);
    }

    #[test]
    fn test_values_uniform_view() {
        let mut doc = CanonicalDocument::new();
        assert!(doc.values("missing").is_empty());
        doc.set_str("single", "x");
        assert_eq!(doc.values("single"), vec!["x"]);
    }

    #[test]
    fn test_prune_empty_keeps_scalars() {
        let mut doc = CanonicalDocument::new();
        doc.set_str("title", "");
        doc.set_multi("keywords_wigos", vec![]);
        doc.set_multi("keywords_keyword", vec!["ice".to_string()]);
        doc.prune_empty();
        assert!(doc.contains("title"));
        assert!(!doc.contains("keywords_wigos"));
        assert!(doc.contains("keywords_keyword"));
    }

    #[test]
    fn test_roundtrip_untagged_json() {
        let mut doc = CanonicalDocument::new();
        doc.set_str("id", "no-test-1");
        doc.set_f64("geographic_extent_rectangle_north", 80.0);
        doc.set_bool("isParent", false);
        doc.set_multi("collection", vec!["ADC".to_string()]);

        let json = serde_json::to_string(&doc).unwrap();
        let back: CanonicalDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(back.str_value("id"), Some("no-test-1"));
        assert_eq!(back.get("isParent"), Some(&FieldValue::Bool(false)));
    }
}
