//! Repeated-group flattening.
//!
//! Every repeated substructure of a record (personnel, data centers,
//! platforms, citations, related-information links, keywords, projects)
//! goes through the same two steps: one-or-many normalization (done by the
//! parser's list view) followed by expansion into prefix-qualified,
//! index-aligned parallel field families.
//!
//! The alignment invariant: every field family of a group has the same
//! length as every sibling family, and position `i` across the family
//! describes the same group instance. A sub-field absent on one instance
//! still occupies its position via a placeholder.

use indexer_common::CanonicalDocument;
use metadata_parser::MetadataElement;
use tracing::{debug, warn};

use crate::vocab::GCMD_VOCABULARY;

/// Personnel role labels and their canonical short codes. Resolved once;
/// entries with a role outside this table are dropped (the index schema
/// has no bucket for them).
pub const PERSONNEL_ROLES: &[(&str, &str)] = &[
    ("Investigator", "investigator"),
    ("Technical contact", "technical"),
    ("Metadata author", "metadata_author"),
    ("Data center contact", "datacenter"),
];

/// Related-information display types and their field-name codes.
pub const RELATED_INFORMATION_TYPES: &[(&str, &str)] = &[
    ("Dataset landing page", "landing_page"),
    ("Users guide", "user_guide"),
    ("Project home page", "home_page"),
    ("Observation facility", "obs_facility"),
    ("Extended metadata", "ext_metadata"),
    ("Scientific publication", "scientific_publication"),
    ("Data paper", "data_paper"),
    ("Data management plan", "data_management_plan"),
    ("Other documentation", "other_documentation"),
];

fn role_code(label: &str) -> Option<&'static str> {
    PERSONNEL_ROLES
        .iter()
        .find(|(role, _)| *role == label)
        .map(|(_, code)| *code)
}

fn related_code(label: &str) -> Option<&'static str> {
    RELATED_INFORMATION_TYPES
        .iter()
        .find(|(kind, _)| *kind == label)
        .map(|(_, code)| *code)
}

/// Writer for one group's aligned field families.
///
/// Each appended row supplies a subset of columns; every other column
/// receives the placeholder, and a column first seen mid-group is
/// backfilled, so all families always have equal length.
pub struct AlignedGroup {
    prefix: String,
    placeholder: String,
    columns: Vec<(String, Vec<String>)>,
    rows: usize,
}

impl AlignedGroup {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_placeholder(prefix, "")
    }

    pub fn with_placeholder(prefix: impl Into<String>, placeholder: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            placeholder: placeholder.into(),
            columns: Vec::new(),
            rows: 0,
        }
    }

    /// Declare a column up front so its family exists even when no row
    /// carries a value for it.
    pub fn ensure_column(&mut self, name: &str) {
        self.column_index(name);
    }

    fn column_index(&mut self, name: &str) -> usize {
        if let Some(index) = self.columns.iter().position(|(column, _)| column == name) {
            return index;
        }
        // backfill rows appended before this column was first seen
        let backfill = vec![self.placeholder.clone(); self.rows];
        self.columns.push((name.to_string(), backfill));
        self.columns.len() - 1
    }

    /// Append one group instance. Missing values become the placeholder.
    pub fn push_row(&mut self, values: Vec<(String, Option<String>)>) {
        let mut filled = vec![false; self.columns.len()];
        for (name, value) in values {
            let index = self.column_index(&name);
            if index >= filled.len() {
                filled.resize(index + 1, false);
            }
            self.columns[index]
                .1
                .push(value.unwrap_or_else(|| self.placeholder.clone()));
            filled[index] = true;
        }
        for (index, (_, column)) in self.columns.iter_mut().enumerate() {
            if !filled.get(index).copied().unwrap_or(false) {
                column.push(self.placeholder.clone());
            }
        }
        self.rows += 1;
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Write the families into the document as `<prefix>_<column>`.
    /// A group that never saw a row writes nothing.
    pub fn write_into(self, doc: &mut CanonicalDocument) {
        if self.rows == 0 {
            return;
        }
        for (name, values) in self.columns {
            doc.set_multi(format!("{}_{}", self.prefix, name), values);
        }
    }
}

fn nonempty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(str::to_string)
}

/// Personnel: role-qualified families plus cross-role facet families.
///
/// Entries whose role is missing or not in the role table are skipped with
/// a warning; the loss is accepted since the index schema has no bucket
/// for unknown roles.
pub fn flatten_personnel(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let personnel = record.children_named("personnel");
    if personnel.is_empty() {
        return;
    }

    let mut groups: Vec<(&'static str, AlignedGroup)> = PERSONNEL_ROLES
        .iter()
        .map(|(_, code)| (*code, AlignedGroup::new(format!("personnel_{code}"))))
        .collect();
    let mut facet_roles = Vec::new();
    let mut facet_names = Vec::new();
    let mut facet_organisations = Vec::new();

    for person in personnel {
        let role_label = person.child_text("role").unwrap_or("");
        let Some(code) = role_code(role_label) else {
            if role_label.is_empty() {
                warn!("No role available for personnel, skipping entry");
            } else {
                warn!(role = %role_label, "Unrecognized role for personnel, skipping entry");
            }
            continue;
        };

        let name = nonempty(person.child_text("name"));
        let organisation = nonempty(person.child_text("organisation"));
        let address = person.child("contact_address");
        let address_field = |field: &str| {
            nonempty(address.and_then(|element| element.child_text(field)))
        };

        facet_roles.push(role_label.to_string());
        facet_names.push(name.clone().unwrap_or_default());
        facet_organisations.push(organisation.clone().unwrap_or_default());

        let Some((_, group)) = groups.iter_mut().find(|(c, _)| *c == code) else {
            continue;
        };
        group.push_row(vec![
            ("role".to_string(), Some(role_label.to_string())),
            ("name".to_string(), name),
            ("email".to_string(), nonempty(person.child_text("email"))),
            ("phone".to_string(), nonempty(person.child_text("phone"))),
            ("fax".to_string(), nonempty(person.child_text("fax"))),
            ("organisation".to_string(), organisation),
            ("address".to_string(), address_field("address")),
            ("address_city".to_string(), address_field("city")),
            (
                "address_province_or_state".to_string(),
                address_field("province_or_state"),
            ),
            (
                "address_postal_code".to_string(),
                address_field("postal_code"),
            ),
            ("address_country".to_string(), address_field("country")),
        ]);
    }

    doc.set_multi("personnel_role", facet_roles);
    doc.set_multi("personnel_name", facet_names);
    doc.set_multi("personnel_organisation", facet_organisations);
    for (_, group) in groups {
        group.write_into(doc);
    }
}

/// Data centers: the nested name level collapses into the group prefix.
pub fn flatten_data_centers(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let centers = record.children_named("data_center");
    if centers.is_empty() {
        return;
    }
    let mut group = AlignedGroup::new("data_center");
    for center in centers {
        let name = center.child("data_center_name");
        group.push_row(vec![
            (
                "long_name".to_string(),
                nonempty(name.and_then(|n| n.child_text("long_name"))),
            ),
            (
                "short_name".to_string(),
                nonempty(name.and_then(|n| n.child_text("short_name"))),
            ),
            (
                "url".to_string(),
                nonempty(center.child_text("data_center_url")),
            ),
        ]);
    }
    group.write_into(doc);
}

/// Platforms: scalar children map to `platform_<name>`, nested ones
/// (instrument) to `platform_<name>_<subname>`.
pub fn flatten_platforms(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let platforms = record.children_named("platform");
    if platforms.is_empty() {
        return;
    }
    let mut group = AlignedGroup::new("platform");
    for platform in platforms {
        group.push_row(nested_row(platform));
    }
    group.write_into(doc);

    // series facet for satellite platforms: "Sentinel-2A" -> "Sentinel-2"
    if let Some(values) = doc.multi("platform_long_name") {
        if let Some(first) = values.first() {
            if first.starts_with("Sentinel") {
                let mut chars = first.chars();
                chars.next_back();
                doc.set_str("platform_sentinel", chars.as_str().to_string());
            }
        }
    }
}

/// Dataset citations: every sub-element becomes an aligned family; bare
/// publication dates are completed to full datetimes, as the index schema
/// requires.
pub fn flatten_citations(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let citations = record.children_named("dataset_citation");
    if citations.is_empty() {
        return;
    }
    let mut group = AlignedGroup::new("dataset_citation");
    for citation in citations {
        let mut row = Vec::new();
        for (name, child) in citation.children() {
            let mut value = nonempty(Some(child.text()));
            if name == "publication_date" {
                value = value.map(|v| if v.contains('T') { v } else { format!("{v}T12:00:00Z") });
            }
            row.push((name.to_string(), value));
        }
        group.push_row(row);
    }
    group.write_into(doc);
}

/// Related-information links: type label resolved through the fixed table
/// into `related_url_<code>` / `related_url_<code>_desc` scalars.
pub fn flatten_related_information(record: &MetadataElement, doc: &mut CanonicalDocument) {
    for info in record.children_named("related_information") {
        let Some(kind) = info.child_text("type") else {
            continue;
        };
        let Some(code) = related_code(kind) else {
            debug!(kind = %kind, "Unrecognized related information type");
            continue;
        };
        if let Some(resource) = info.child_text("resource") {
            doc.set_str(format!("related_url_{code}"), resource);
            if let Some(description) = info.child_text("description") {
                doc.set_str(format!("related_url_{code}_desc"), description);
            }
        }
    }
}

/// Keywords: full keyword/vocabulary families plus the GCMD-only shadow
/// family used for faceting, selected case-insensitively.
pub fn flatten_keywords(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let sets = record.children_named("keywords");
    if sets.is_empty() {
        return;
    }
    let mut keywords = Vec::new();
    let mut vocabularies = Vec::new();
    let mut gcmd = Vec::new();
    for set in &sets {
        let vocabulary = set.attr("vocabulary").unwrap_or("");
        for keyword in set.children_named("keyword") {
            let text = keyword.text();
            if text.is_empty() {
                continue;
            }
            if vocabulary.eq_ignore_ascii_case(GCMD_VOCABULARY) {
                gcmd.push(text.to_string());
            }
            keywords.push(text.to_string());
            vocabularies.push(vocabulary.to_string());
        }
    }
    doc.set_multi("keywords_keyword", keywords);
    doc.set_multi("keywords_vocabulary", vocabularies);
    doc.set_multi("keywords_gcmd", gcmd);
    // reserved facet, populated once the vocabulary is adopted
    doc.set_multi("keywords_wigos", Vec::new());
}

/// Projects: short/long name families with an explicit placeholder.
pub fn flatten_projects(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let projects = record.children_named("project");
    if projects.is_empty() {
        return;
    }
    let mut group = AlignedGroup::with_placeholder("project", "Not provided");
    group.ensure_column("short_name");
    group.ensure_column("long_name");
    for project in projects {
        group.push_row(vec![
            (
                "short_name".to_string(),
                nonempty(project.child_text("short_name")),
            ),
            (
                "long_name".to_string(),
                nonempty(project.child_text("long_name")),
            ),
        ]);
    }
    group.write_into(doc);
}

/// Expand one instance's children into a flat row: scalar children keep
/// their name, one-level-nested children contribute `<name>_<subname>`.
fn nested_row(instance: &MetadataElement) -> Vec<(String, Option<String>)> {
    let mut row = Vec::new();
    for (name, child) in instance.children() {
        if child.has_children() {
            for (sub, subchild) in child.children() {
                row.push((format!("{name}_{sub}"), nonempty(Some(subchild.text()))));
            }
        } else {
            row.push((name.to_string(), nonempty(Some(child.text()))));
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use metadata_parser::parse_str;

    #[test]
    fn test_aligned_group_backfills_new_columns() {
        let mut group = AlignedGroup::new("g");
        group.push_row(vec![("a".to_string(), Some("1".to_string()))]);
        group.push_row(vec![
            ("a".to_string(), Some("2".to_string())),
            ("b".to_string(), Some("x".to_string())),
        ]);
        let mut doc = CanonicalDocument::new();
        group.write_into(&mut doc);
        assert_eq!(doc.multi("g_a"), Some(&["1".to_string(), "2".to_string()][..]));
        // column b first seen on row 2: one placeholder before its value
        assert_eq!(doc.multi("g_b"), Some(&["".to_string(), "x".to_string()][..]));
    }

    #[test]
    fn test_aligned_group_placeholder_for_missing_values() {
        let mut group = AlignedGroup::with_placeholder("g", "Not provided");
        group.push_row(vec![
            ("a".to_string(), Some("1".to_string())),
            ("b".to_string(), None),
        ]);
        let mut doc = CanonicalDocument::new();
        group.write_into(&mut doc);
        assert_eq!(doc.multi("g_b"), Some(&["Not provided".to_string()][..]));
    }

    #[test]
    fn test_personnel_families_are_aligned() {
        let record = parse_str(
            "<mmd>\
             <personnel><role>Investigator</role><name>A</name><email>a@x</email></personnel>\
             <personnel><role>Investigator</role><name>B</name></personnel>\
             <personnel><role>Skipper</role><name>C</name></personnel>\
             </mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        flatten_personnel(&record, &mut doc);

        // the unrecognized role is dropped entirely
        assert_eq!(doc.multi("personnel_name").unwrap().len(), 2);
        assert_eq!(doc.multi("personnel_role").unwrap().len(), 2);
        // role-qualified families stay aligned, with a placeholder for B's email
        assert_eq!(doc.multi("personnel_investigator_name").unwrap().len(), 2);
        assert_eq!(
            doc.multi("personnel_investigator_email"),
            Some(&["a@x".to_string(), "".to_string()][..])
        );
    }

    #[test]
    fn test_personnel_address_subfields() {
        let record = parse_str(
            "<mmd><personnel><role>Technical contact</role><name>T</name>\
             <contact_address><address>Road 1</address><city>Oslo</city>\
             <postal_code>0313</postal_code><country>Norway</country></contact_address>\
             </personnel></mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        flatten_personnel(&record, &mut doc);
        assert_eq!(
            doc.multi("personnel_technical_address_city"),
            Some(&["Oslo".to_string()][..])
        );
        assert_eq!(
            doc.multi("personnel_technical_address"),
            Some(&["Road 1".to_string()][..])
        );
    }

    #[test]
    fn test_data_center_families() {
        let record = parse_str(
            "<mmd>\
             <data_center><data_center_name><long_name>Norwegian Meteorological Institute</long_name>\
             <short_name>MET</short_name></data_center_name>\
             <data_center_url>https://met.no</data_center_url></data_center>\
             <data_center><data_center_name><short_name>NPI</short_name></data_center_name></data_center>\
             </mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        flatten_data_centers(&record, &mut doc);
        assert_eq!(doc.multi("data_center_short_name").unwrap().len(), 2);
        assert_eq!(doc.multi("data_center_url").unwrap().len(), 2);
        assert_eq!(doc.multi("data_center_url").unwrap()[1], "");
    }

    #[test]
    fn test_platform_nested_instrument() {
        let record = parse_str(
            "<mmd><platform><short_name>S2A</short_name><long_name>Sentinel-2A</long_name>\
             <instrument><short_name>MSI</short_name><long_name>MultiSpectral Imager</long_name>\
             </instrument></platform></mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        flatten_platforms(&record, &mut doc);
        assert_eq!(
            doc.multi("platform_instrument_short_name"),
            Some(&["MSI".to_string()][..])
        );
        assert_eq!(doc.str_value("platform_sentinel"), Some("Sentinel-2"));
    }

    #[test]
    fn test_citation_publication_date_completed() {
        let record = parse_str(
            "<mmd><dataset_citation><author>Somebody</author>\
             <publication_date>2021-05-01</publication_date></dataset_citation></mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        flatten_citations(&record, &mut doc);
        assert_eq!(
            doc.multi("dataset_citation_publication_date"),
            Some(&["2021-05-01T12:00:00Z".to_string()][..])
        );
    }

    #[test]
    fn test_related_information_lookup() {
        let record = parse_str(
            "<mmd><related_information><type>Dataset landing page</type>\
             <resource>https://x/landing</resource><description>Landing</description>\
             </related_information>\
             <related_information><type>Mystery</type><resource>https://y</resource>\
             </related_information></mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        flatten_related_information(&record, &mut doc);
        assert_eq!(doc.str_value("related_url_landing_page"), Some("https://x/landing"));
        assert_eq!(doc.str_value("related_url_landing_page_desc"), Some("Landing"));
        assert!(!doc.contains("related_url_mystery"));
    }

    #[test]
    fn test_keywords_gcmd_shadow_family() {
        let record = parse_str(
            "<mmd>\
             <keywords vocabulary=\"gcmdsk\"><keyword>EARTH SCIENCE &gt; CRYOSPHERE</keyword></keywords>\
             <keywords vocabulary=\"None\"><keyword>sea ice</keyword><keyword>arctic</keyword></keywords>\
             </mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        flatten_keywords(&record, &mut doc);
        assert_eq!(doc.multi("keywords_keyword").unwrap().len(), 3);
        assert_eq!(doc.multi("keywords_vocabulary").unwrap().len(), 3);
        // case-insensitive vocabulary match
        assert_eq!(doc.multi("keywords_gcmd").unwrap().len(), 1);
    }

    #[test]
    fn test_projects_placeholder() {
        let record = parse_str(
            "<mmd><project><short_name>CC</short_name></project></mmd>",
        )
        .unwrap();
        let mut doc = CanonicalDocument::new();
        flatten_projects(&record, &mut doc);
        assert_eq!(doc.multi("project_short_name"), Some(&["CC".to_string()][..]));
        assert_eq!(
            doc.multi("project_long_name"),
            Some(&["Not provided".to_string()][..])
        );
    }
}
