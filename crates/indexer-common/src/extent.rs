//! Geographic extent and derived search geometries.

use serde::{Deserialize, Serialize};

/// A geographic bounding rectangle in degrees (EPSG:4326).
///
/// Longitudes are positive eastwards in [-180, 180]; north >= south.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeographicExtent {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeographicExtent {
    pub fn new(north: f64, south: f64, east: f64, west: f64) -> Self {
        Self {
            north,
            south,
            east,
            west,
        }
    }

    /// Whole-globe extent. Used as the fallback when a record carries no
    /// usable bounds; note that it matches every spatial query.
    pub fn world() -> Self {
        Self {
            north: 90.0,
            south: -90.0,
            east: 180.0,
            west: -180.0,
        }
    }

    /// Smallest box enclosing a set of latitude and longitude samples.
    ///
    /// Returns `None` when either axis has no samples.
    pub fn from_samples(lats: &[f64], lons: &[f64]) -> Option<Self> {
        if lats.is_empty() || lons.is_empty() {
            return None;
        }
        let mut north = f64::MIN;
        let mut south = f64::MAX;
        let mut east = f64::MIN;
        let mut west = f64::MAX;
        for &lat in lats {
            north = north.max(lat);
            south = south.min(lat);
        }
        for &lon in lons {
            east = east.max(lon);
            west = west.min(lon);
        }
        Some(Self {
            north,
            south,
            east,
            west,
        })
    }

    /// The extent degenerates to a single location.
    pub fn is_point(&self) -> bool {
        self.north == self.south && self.east == self.west
    }

    /// Spatial envelope notation for index range queries.
    ///
    /// Argument order is fixed as (west, east, north, south).
    pub fn envelope(&self) -> String {
        format!(
            "ENVELOPE({},{},{},{})",
            self.west, self.east, self.north, self.south
        )
    }

    /// WKT geometry for the polygon field: a point when the rectangle
    /// degenerates to a single location, otherwise the axis-aligned
    /// rectangle polygon as a closed ring.
    pub fn geometry_wkt(&self) -> String {
        if self.is_point() {
            format!("POINT ({} {})", self.east, self.north)
        } else {
            format!(
                "POLYGON (({w} {s}, {e} {s}, {e} {n}, {w} {n}, {w} {s}))",
                w = self.west,
                e = self.east,
                s = self.south,
                n = self.north
            )
        }
    }
}
