//! Required-element and controlled-vocabulary checks.
//!
//! Violations are corrected or logged, never fatal: a missing required
//! element is defaulted to "Unknown", a value outside its vocabulary is
//! kept as-is with a warning.

use metadata_parser::MetadataElement;
use tracing::{info, warn};

/// Elements every record must carry with a non-empty value.
///
/// Temporal and spatial extent are deliberately not required; requiring
/// them would break ingestion for several communities, the Arctic ones
/// especially.
pub const REQUIRED_ELEMENTS: &[&str] = &[
    "metadata_version",
    "metadata_identifier",
    "title",
    "abstract",
    "metadata_status",
    "dataset_production_status",
    "collection",
    "last_metadata_update",
    "iso_topic_category",
    "keywords",
];

/// Default substituted for a missing required element.
pub const UNKNOWN_SENTINEL: &str = "Unknown";

pub const ISO_TOPIC_CATEGORIES: &[&str] = &[
    "farming",
    "biota",
    "boundaries",
    "climatologyMeteorologyAtmosphere",
    "economy",
    "elevation",
    "environment",
    "geoscientificInformation",
    "health",
    "imageryBaseMapsEarthCover",
    "inlandWaters",
    "location",
    "oceans",
    "planningCadastre",
    "society",
    "structure",
    "transportation",
    "utilitiesCommunication",
];

pub const COLLECTIONS: &[&str] = &[
    "ACCESS",
    "ADC",
    "AeN",
    "APPL",
    "CC",
    "DAM",
    "DOKI",
    "GCW",
    "NBS",
    "NMAP",
    "NMDC",
    "NSDN",
    "SIOS",
    "SESS_2018",
    "SESS_2019",
    "SIOS_access_programme",
    "YOPP",
];

pub const DATASET_PRODUCTION_STATUSES: &[&str] = &["Planned", "In Work", "Complete", "Obsolete"];

pub const QUALITY_CONTROL_LEVELS: &[&str] = &[
    "No quality control",
    "Basic quality control",
    "Extended quality control",
    "Comprehensive quality control",
];

/// Vocabulary attribute value marking keyword sets that are mirrored into
/// the dedicated facet field. Matched case-insensitively.
pub const GCMD_VOCABULARY: &str = "GCMDSK";

const CONTROLLED_ELEMENTS: &[(&str, &[&str])] = &[
    ("iso_topic_category", ISO_TOPIC_CATEGORIES),
    ("collection", COLLECTIONS),
    ("dataset_production_status", DATASET_PRODUCTION_STATUSES),
    ("quality_control", QUALITY_CONTROL_LEVELS),
];

/// Check and correct a record in place. Never fails.
///
/// The only mutation allowed on a record after parsing: missing or empty
/// required elements are filled with the "Unknown" sentinel.
pub fn validate(record: &mut MetadataElement) {
    check_required(record);
    check_vocabularies(record);
    check_gcmd_keywords(record);
}

fn check_required(record: &mut MetadataElement) {
    for name in REQUIRED_ELEMENTS {
        let present = record
            .children_named(name)
            .iter()
            .any(|element| !element.is_blank());
        if present {
            info!(element = name, "Required element present and non-empty");
        } else {
            warn!(element = name, "Required element missing, setting it to Unknown");
            record.set_child_text(name, UNKNOWN_SENTINEL);
        }
    }
}

fn check_vocabularies(record: &MetadataElement) {
    for (name, allowed) in CONTROLLED_ELEMENTS {
        for element in record.children_named(name) {
            let value = element.text();
            if value.is_empty() {
                warn!(element = name, "Discovered an empty element");
            } else if !allowed.contains(&value) {
                warn!(element = name, value = %value, "Element contains non-valid content");
            }
        }
    }
}

fn check_gcmd_keywords(record: &MetadataElement) {
    let has_gcmd = record.children_named("keywords").iter().any(|set| {
        set.attr("vocabulary")
            .is_some_and(|vocabulary| vocabulary.eq_ignore_ascii_case(GCMD_VOCABULARY))
    });
    if !has_gcmd {
        warn!("Keywords in GCMD are not available");
    }
}
