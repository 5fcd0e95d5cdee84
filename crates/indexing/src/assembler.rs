//! Canonical document assembly.
//!
//! Orchestrates the validator's output through temporal normalization,
//! geometry derivation and group flattening, plus the record-specific
//! handling that is not generic enough to share: identifier sanitization,
//! language-tagged title/abstract selection, use-constraint pairing, data
//! access links, the parent reference, storage information, and the
//! provenance blob.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::warn;

use indexer_common::{CanonicalDocument, IndexerError, Result};
use metadata_parser::MetadataElement;

use crate::{flatten, geometry, temporal};

/// Dataset catalog level: aggregate (parent/standalone) or individual
/// (child) records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetLevel {
    Level1,
    Level2,
}

impl DatasetLevel {
    pub fn from_arg(level: u8) -> Result<Self> {
        match level {
            1 => Ok(DatasetLevel::Level1),
            2 => Ok(DatasetLevel::Level2),
            other => Err(IndexerError::InvalidLevel(other)),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            DatasetLevel::Level1 => "Level-1",
            DatasetLevel::Level2 => "Level-2",
        }
    }
}

/// Replace store-hostile characters in a record identifier.
///
/// The sanitized form is the store's primary key. The transform is
/// deterministic and idempotent, so re-ingesting the same record always
/// hits the same document.
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier.replace([':', '/', '.'], "-")
}

/// Build the flat canonical document for one record.
///
/// `raw_xml` is the verbatim source document, embedded base64-encoded for
/// provenance. The record is expected to have passed the validator, so the
/// required elements exist (possibly as the "Unknown" sentinel).
pub fn transform(
    record: &MetadataElement,
    raw_xml: &str,
    level: DatasetLevel,
) -> Result<CanonicalDocument> {
    let mut doc = CanonicalDocument::new();

    identifier(record, &mut doc);
    scalar_passthroughs(record, &mut doc);
    multi_passthroughs(record, &mut doc);
    language_tagged(record, "title", &mut doc);
    language_tagged(record, "abstract", &mut doc);

    temporal::flatten_update_events(record, &mut doc);
    temporal::flatten_temporal_extent(record, &mut doc);
    geometry::derive_geometry(record, &mut doc)?;

    flatten::flatten_personnel(record, &mut doc);
    flatten::flatten_data_centers(record, &mut doc);
    flatten::flatten_platforms(record, &mut doc);
    flatten::flatten_citations(record, &mut doc);
    flatten::flatten_related_information(record, &mut doc);
    flatten::flatten_keywords(record, &mut doc);
    flatten::flatten_projects(record, &mut doc);

    data_access(record, &mut doc);
    related_dataset(record, &mut doc);
    storage_information(record, &mut doc);
    use_constraint(record, &mut doc);

    match level {
        DatasetLevel::Level1 => {
            doc.set_str("dataset_type", level.tag());
            // initial default; the linker flips this when a child arrives
            doc.set_bool("isParent", false);
        }
        DatasetLevel::Level2 => {
            doc.set_str("dataset_type", level.tag());
            doc.set_bool("isChild", true);
        }
    }

    doc.set_str("metadata_xml_b64", BASE64.encode(raw_xml.as_bytes()));

    Ok(doc)
}

fn identifier(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let raw = record.child_text("metadata_identifier").unwrap_or("");
    doc.set_str("id", sanitize_identifier(raw));
    doc.set_str("metadata_identifier", raw);
}

fn scalar_passthroughs(record: &MetadataElement, doc: &mut CanonicalDocument) {
    for name in [
        "metadata_status",
        "dataset_production_status",
        "dataset_language",
        "operational_status",
        "access_constraint",
        "quality_control",
    ] {
        if let Some(value) = record.child_text(name) {
            doc.set_str(name, value);
        }
    }
}

fn multi_passthroughs(record: &MetadataElement, doc: &mut CanonicalDocument) {
    for name in ["collection", "iso_topic_category", "activity_type"] {
        let values: Vec<String> = record
            .children_named(name)
            .iter()
            .map(|element| element.text().to_string())
            .filter(|value| !value.is_empty())
            .collect();
        if !values.is_empty() {
            doc.set_multi(name, values);
        }
    }
}

/// Title/abstract may repeat per language. Prefer the English-tagged
/// variant; an untagged sole value is accepted as-is.
fn language_tagged(record: &MetadataElement, name: &str, doc: &mut CanonicalDocument) {
    let variants = record.children_named(name);
    let selected = variants
        .iter()
        .find(|element| element.attr("lang") == Some("en"))
        .or_else(|| variants.iter().find(|element| element.attr("lang").is_none()));
    match selected {
        Some(element) if !element.text().is_empty() => doc.set_str(name, element.text()),
        _ => {
            if !variants.is_empty() {
                warn!(element = name, "No usable language variant found");
            }
        }
    }
}

/// One `data_access_url_<type>` field per access entry, plus the WMS layer
/// list for the OGC WMS entry.
fn data_access(record: &MetadataElement, doc: &mut CanonicalDocument) {
    for access in record.children_named("data_access") {
        let Some(kind) = access.child_text("type") else {
            continue;
        };
        let kind = kind.to_lowercase().replace(' ', "_");
        if let Some(resource) = access.child_text("resource") {
            doc.set_str(format!("data_access_url_{kind}"), resource);
        }
        if kind == "ogc_wms" {
            if let Some(layers) = access.child("wms_layers") {
                let names: Vec<String> = layers
                    .children()
                    .map(|(_, layer)| layer.text().to_string())
                    .filter(|name| !name.is_empty())
                    .collect();
                if !names.is_empty() {
                    doc.set_multi("data_access_wms_layers", names);
                }
            }
        }
    }
}

/// Only the parent-typed relation is representable in the index schema.
/// Records predating the relation-type attribute carry a bare reference,
/// accepted when it is the sole entry.
fn related_dataset(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let relations = record.children_named("related_dataset");
    let parent = relations
        .iter()
        .find(|relation| relation.attr("relation_type") == Some("parent"))
        .or_else(|| match relations.as_slice() {
            [sole] if sole.attr("relation_type").is_none() => Some(sole),
            _ => None,
        });
    if let Some(relation) = parent {
        let reference = relation.text();
        if !reference.is_empty() {
            doc.set_str("related_dataset", sanitize_identifier(reference));
        }
    }
}

fn storage_information(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let Some(info) = record.child("storage_information") else {
        return;
    };
    for (child, field) in [
        ("file_name", "storage_information_file_name"),
        ("file_location", "storage_information_file_location"),
        ("file_format", "storage_information_file_format"),
    ] {
        if let Some(value) = info.child_text(child) {
            doc.set_str(field, value);
        }
    }
    if let Some(size) = info.child("file_size") {
        match (size.attr("unit"), size.text()) {
            (Some(unit), value) if !value.is_empty() => {
                doc.set_str("storage_information_file_size", value);
                doc.set_str("storage_information_file_size_unit", unit);
            }
            _ => warn!("File size unit not specified, skipping field"),
        }
    }
    if let Some(checksum) = info.child("checksum") {
        match (checksum.attr("type"), checksum.text()) {
            (Some(kind), value) if !value.is_empty() => {
                doc.set_str("storage_information_file_checksum", value);
                doc.set_str("storage_information_file_checksum_type", kind);
            }
            _ => warn!("Checksum type not specified, skipping field"),
        }
    }
}

/// The license needs both an identifier and a resource to be indexable;
/// a half-specified pair is replaced entirely rather than partially
/// populated.
fn use_constraint(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let Some(constraint) = record.child("use_constraint") else {
        return;
    };
    if constraint.is_blank() {
        return;
    }
    match (
        constraint.child_text("identifier"),
        constraint.child_text("resource"),
    ) {
        (Some(identifier), Some(resource)) => {
            doc.set_str("use_constraint_identifier", identifier);
            doc.set_str("use_constraint_resource", resource);
        }
        _ => {
            warn!("Both license identifier and resource are needed to index the use constraint");
            doc.set_str("use_constraint_identifier", "Not provided");
            doc.set_str("use_constraint_resource", "Not provided");
        }
    }
    if let Some(text) = constraint.child_text("license_text") {
        doc.set_str("use_constraint_license_text", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metadata_parser::parse_str;

    const MINIMAL: &str = "<mmd>\
        <metadata_identifier>no:aa/bb.cc</metadata_identifier>\
        <title>Test dataset</title>\
        <abstract xml:lang=\"en\">About</abstract>\
        <metadata_status>Active</metadata_status>\
        <geographic_extent><rectangle>\
        <north>70</north><south>60</south><east>20</east><west>10</west>\
        </rectangle></geographic_extent>\
        </mmd>";

    #[test]
    fn test_sanitize_is_idempotent_and_deterministic() {
        assert_eq!(sanitize_identifier("no:aa/bb.cc"), "no-aa-bb-cc");
        assert_eq!(
            sanitize_identifier(&sanitize_identifier("no:aa/bb.cc")),
            sanitize_identifier("no:aa/bb.cc")
        );
    }

    #[test]
    fn test_transform_level_tags() {
        let record = parse_str(MINIMAL).unwrap();
        let doc = transform(&record, MINIMAL, DatasetLevel::Level1).unwrap();
        assert_eq!(doc.str_value("dataset_type"), Some("Level-1"));
        assert_eq!(doc.get("isParent"), Some(&indexer_common::FieldValue::Bool(false)));

        let doc = transform(&record, MINIMAL, DatasetLevel::Level2).unwrap();
        assert_eq!(doc.str_value("dataset_type"), Some("Level-2"));
        assert!(!doc.contains("isParent"));
        assert_eq!(doc.get("isChild"), Some(&indexer_common::FieldValue::Bool(true)));
    }

    #[test]
    fn test_transform_sets_store_key() {
        let record = parse_str(MINIMAL).unwrap();
        let doc = transform(&record, MINIMAL, DatasetLevel::Level1).unwrap();
        assert_eq!(doc.id(), Some("no-aa-bb-cc"));
        assert_eq!(doc.str_value("metadata_identifier"), Some("no:aa/bb.cc"));
    }

    #[test]
    fn test_invalid_level_rejected() {
        assert!(matches!(
            DatasetLevel::from_arg(3),
            Err(IndexerError::InvalidLevel(3))
        ));
    }

    #[test]
    fn test_language_selection_prefers_english() {
        let record = parse_str(
            "<mmd><title xml:lang=\"no\">Hav</title><title xml:lang=\"en\">Ocean</title></mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        language_tagged(&record, "title", &mut doc);
        assert_eq!(doc.str_value("title"), Some("Ocean"));
    }

    #[test]
    fn test_language_selection_accepts_untagged_sole_value() {
        let record = parse_str("<mmd><title>Ocean</title></mmd>").unwrap();
        let mut doc = CanonicalDocument::new();
        language_tagged(&record, "title", &mut doc);
        assert_eq!(doc.str_value("title"), Some("Ocean"));
    }

    #[test]
    fn test_use_constraint_requires_both() {
        let record = parse_str(
            "<mmd><use_constraint><identifier>CC-BY-4.0</identifier></use_constraint></mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        use_constraint(&record, &mut doc);
        assert_eq!(doc.str_value("use_constraint_identifier"), Some("Not provided"));
        assert_eq!(doc.str_value("use_constraint_resource"), Some("Not provided"));
    }

    #[test]
    fn test_data_access_type_qualified_urls() {
        let record = parse_str(
            "<mmd>\
             <data_access><type>OPeNDAP</type><resource>https://x/dap</resource></data_access>\
             <data_access><type>OGC WMS</type><resource>https://x/wms</resource>\
             <wms_layers><wms_layer>ice_conc</wms_layer></wms_layers></data_access>\
             </mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        data_access(&record, &mut doc);
        assert_eq!(doc.str_value("data_access_url_opendap"), Some("https://x/dap"));
        assert_eq!(doc.str_value("data_access_url_ogc_wms"), Some("https://x/wms"));
        assert_eq!(
            doc.multi("data_access_wms_layers"),
            Some(&["ice_conc".to_string()][..])
        );
    }

    #[test]
    fn test_related_dataset_parent_only() {
        let record = parse_str(
            "<mmd>\
             <related_dataset relation_type=\"sibling\">no:x/1</related_dataset>\
             <related_dataset relation_type=\"parent\">no:x/parent.1</related_dataset>\
             </mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        related_dataset(&record, &mut doc);
        assert_eq!(doc.str_value("related_dataset"), Some("no-x-parent-1"));
    }

    #[test]
    fn test_storage_information_unit_rules() {
        let record = parse_str(
            "<mmd><storage_information>\
             <file_name>a.nc</file_name>\
             <file_size unit=\"MB\">42</file_size>\
             <checksum>abcd</checksum>\
             </storage_information></mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        storage_information(&record, &mut doc);
        assert_eq!(doc.str_value("storage_information_file_size"), Some("42"));
        assert_eq!(doc.str_value("storage_information_file_size_unit"), Some("MB"));
        // checksum without a type attribute is skipped
        assert!(!doc.contains("storage_information_file_checksum"));
    }

    #[test]
    fn test_provenance_blob_roundtrip() {
        let record = parse_str(MINIMAL).unwrap();
        let doc = transform(&record, MINIMAL, DatasetLevel::Level1).unwrap();
        let blob = doc.str_value("metadata_xml_b64").unwrap();
        let decoded = BASE64.decode(blob).unwrap();
        assert_eq!(decoded, MINIMAL.as_bytes());
    }
}
