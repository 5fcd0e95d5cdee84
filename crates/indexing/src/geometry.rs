//! Geographic extent derivation.
//!
//! Longitudes are assumed positive eastwards in [-180, 180]. A single
//! rectangle maps its bounds directly; several rectangles flatten to the
//! smallest enclosing box (the index schema cannot hold more than one box,
//! so precision is knowingly lost). A record with a single rectangle
//! missing a bound is fatal for that record; a record with no usable
//! bounds at all falls back to the world extent, which silently matches
//! every spatial query.

use indexer_common::{CanonicalDocument, GeographicExtent, IndexerError, Result};
use metadata_parser::MetadataElement;
use tracing::warn;

/// Derive the bound fields, the envelope and the WKT geometry for a
/// record. The document must already carry its id (used in the fatal
/// error).
pub fn derive_geometry(record: &MetadataElement, doc: &mut CanonicalDocument) -> Result<()> {
    let rectangles: Vec<&MetadataElement> = record
        .children_named("geographic_extent")
        .iter()
        .flat_map(|extent| extent.children_named("rectangle"))
        .collect();

    match rectangles.len() {
        0 => {
            warn!("No geographic extent present, falling back to the world extent");
            apply(doc, GeographicExtent::world());
            Ok(())
        }
        1 => single_rectangle(rectangles[0], doc),
        _ => {
            warn!(
                "Multiple bounding boxes are not supported by the index schema, \
                 flattening to the enclosing box"
            );
            flattened_rectangles(&rectangles, doc);
            Ok(())
        }
    }
}

fn bound(rectangle: &MetadataElement, name: &str) -> Option<f64> {
    let raw = rectangle.child_text(name)?;
    match raw.parse::<f64>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(bound = name, value = %raw, "Unparseable geographic bound");
            None
        }
    }
}

fn single_rectangle(rectangle: &MetadataElement, doc: &mut CanonicalDocument) -> Result<()> {
    let north = bound(rectangle, "north");
    let south = bound(rectangle, "south");
    let east = bound(rectangle, "east");
    let west = bound(rectangle, "west");

    let (Some(north), Some(south), Some(east), Some(west)) = (north, south, east, west) else {
        warn!("Missing geographic element, will not process the record");
        doc.set_str("metadata_status", "Inactive");
        let id = doc.id().unwrap_or("<unknown>").to_string();
        return Err(IndexerError::MissingSpatialBounds(id));
    };

    if let Some(srs_name) = rectangle.attr("srsName") {
        doc.set_str("geographic_extent_rectangle_srsName", srs_name);
    }
    apply(doc, GeographicExtent::new(north, south, east, west));
    Ok(())
}

fn flattened_rectangles(rectangles: &[&MetadataElement], doc: &mut CanonicalDocument) {
    let mut lats = Vec::new();
    let mut lons = Vec::new();
    for rectangle in rectangles {
        // missing bounds inside a multi-rectangle set just contribute
        // fewer samples
        if let Some(north) = bound(rectangle, "north") {
            lats.push(north);
        }
        if let Some(south) = bound(rectangle, "south") {
            lats.push(south);
        }
        if let Some(east) = bound(rectangle, "east") {
            lons.push(east);
        }
        if let Some(west) = bound(rectangle, "west") {
            lons.push(west);
        }
    }

    match GeographicExtent::from_samples(&lats, &lons) {
        Some(extent) => apply(doc, extent),
        None => {
            warn!("No usable bounds in any rectangle, falling back to the world extent");
            apply(doc, GeographicExtent::world());
        }
    }
}

fn apply(doc: &mut CanonicalDocument, extent: GeographicExtent) {
    doc.set_f64("geographic_extent_rectangle_north", extent.north);
    doc.set_f64("geographic_extent_rectangle_south", extent.south);
    doc.set_f64("geographic_extent_rectangle_east", extent.east);
    doc.set_f64("geographic_extent_rectangle_west", extent.west);
    doc.set_str("bbox", extent.envelope());
    doc.set_str("polygon_rpt", extent.geometry_wkt());
}
