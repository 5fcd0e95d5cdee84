//! Temporal field normalization.
//!
//! Two field groups carry timestamps: the metadata update trail (one or
//! many update events) and the dataset's temporal extent (one or many
//! start/end pairs, possibly with unknown boundaries).

use indexer_common::time::{
    ensure_utc_marker, format_utc, is_unknown_placeholder, parse_datetime, EARLIEST_SEED,
    LATEST_SEED,
};
use indexer_common::CanonicalDocument;
use metadata_parser::MetadataElement;
use tracing::warn;

use crate::flatten::AlignedGroup;

/// Flatten the metadata update trail into aligned datetime/type/note
/// families. Every datetime carries an explicit UTC marker; no timezone
/// conversion takes place.
pub fn flatten_update_events(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let Some(last_update) = record.child("last_metadata_update") else {
        return;
    };

    let updates = last_update.children_named("update");
    if updates.is_empty() {
        // legacy form: a bare datetime instead of update events
        let value = last_update.text();
        if value.is_empty() {
            return;
        }
        if parse_datetime(value).is_none() {
            warn!(value = %value, "Unparseable metadata update datetime, skipping field");
            return;
        }
        doc.set_multi(
            "last_metadata_update_datetime",
            vec![ensure_utc_marker(value)],
        );
        return;
    }

    let mut group = AlignedGroup::new("last_metadata_update");
    for update in updates {
        group.push_row(vec![
            (
                "datetime".to_string(),
                update.child_text("datetime").map(ensure_utc_marker),
            ),
            (
                "type".to_string(),
                update.child_text("type").map(str::to_string),
            ),
            (
                "note".to_string(),
                update.child_text("note").map(str::to_string),
            ),
        ]);
    }
    group.write_into(doc);
}

/// Derive the start/end extent fields.
///
/// A single extent maps its boundaries directly; several extents reduce to
/// the overall min/max, seeded so that any real timestamp replaces the
/// seed. Unknown boundaries (`--`, empty, absent) are left out of the
/// document; an unparseable timestamp is logged and skipped, never fatal.
pub fn flatten_temporal_extent(record: &MetadataElement, doc: &mut CanonicalDocument) {
    let extents = record.children_named("temporal_extent");
    match extents.len() {
        0 => {}
        1 => single_extent(extents[0], doc),
        _ => reduced_extent(&extents, doc),
    }
}

fn single_extent(extent: &MetadataElement, doc: &mut CanonicalDocument) {
    for (child, field) in [
        ("start_date", "temporal_extent_start_date"),
        ("end_date", "temporal_extent_end_date"),
    ] {
        let Some(raw) = extent.child_text(child) else {
            continue;
        };
        if is_unknown_placeholder(raw) {
            continue;
        }
        match parse_datetime(raw) {
            Some(dt) => doc.set_str(field, format_utc(&dt)),
            None => warn!(value = %raw, "Date format could not be parsed"),
        }
    }
}

fn reduced_extent(extents: &[&MetadataElement], doc: &mut CanonicalDocument) {
    // seeds bracket every real timestamp, so the first parsed value
    // replaces both
    let Some(seed_min) = parse_datetime(EARLIEST_SEED) else {
        return;
    };
    let Some(seed_max) = parse_datetime(LATEST_SEED) else {
        return;
    };
    let mut earliest = seed_min;
    let mut latest = seed_max;
    let mut seen = false;

    for extent in extents {
        for child in ["start_date", "end_date"] {
            for element in extent.children_named(child) {
                let raw = element.text();
                if is_unknown_placeholder(raw) {
                    continue;
                }
                let Some(dt) = parse_datetime(raw) else {
                    warn!(value = %raw, "Date format could not be parsed");
                    continue;
                };
                earliest = earliest.min(dt);
                latest = latest.max(dt);
                seen = true;
            }
        }
    }

    if seen {
        doc.set_str("temporal_extent_start_date", format_utc(&earliest));
        doc.set_str("temporal_extent_end_date", format_utc(&latest));
    }
}
