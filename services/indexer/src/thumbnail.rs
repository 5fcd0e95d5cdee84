//! Map thumbnail retrieval from a WMS endpoint.
//!
//! The capabilities document is fetched to resolve the layer and style: a
//! requested layer or style that the service does not offer silently falls
//! back to the first available one. The map image itself is fetched with a
//! plain GetMap request and embedded as a base64 data URI.

use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use tracing::{info, warn};

use metadata_parser::MetadataElement;

/// Per-call thumbnail settings.
///
/// Always passed explicitly as a parameter; never kept as shared mutable
/// state, so call order cannot change the result.
#[derive(Debug, Clone)]
pub struct ThumbnailConfig {
    /// Requested WMS layer; falls back to the first advertised layer
    pub layer: Option<String>,
    /// Requested WMS style; falls back to the first advertised style
    pub style: Option<String>,
    /// Padding in degrees added on every side of the layer extent
    pub zoom_padding: f64,
    /// CRS code for the GetMap request
    pub projection: String,
    /// Explicit extent override as [west, south, east, north]
    pub extent: Option<[f64; 4]>,
    pub width: u32,
    pub height: u32,
}

impl Default for ThumbnailConfig {
    fn default() -> Self {
        Self {
            layer: None,
            style: None,
            zoom_padding: 0.0,
            projection: "EPSG:4326".to_string(),
            extent: None,
            width: 450,
            height: 450,
        }
    }
}

/// A layer advertised by the map service.
#[derive(Debug, Clone)]
struct WmsLayer {
    name: String,
    styles: Vec<String>,
    /// [west, south, east, north]
    bbox: Option<[f64; 4]>,
}

/// Fetch a thumbnail for the given WMS endpoint and return it as a
/// `data:image/png;base64,` URI.
pub async fn fetch_thumbnail(
    http: &Client,
    wms_url: &str,
    config: &ThumbnailConfig,
) -> Result<String> {
    let base_url = wms_url.split('?').next().unwrap_or(wms_url);

    let capabilities = http
        .get(base_url)
        .query(&[
            ("service", "WMS"),
            ("version", "1.1.1"),
            ("request", "GetCapabilities"),
        ])
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let layers = parse_capabilities(&capabilities)?;
    let layer = choose_layer(&layers, config.layer.as_deref())
        .ok_or_else(|| anyhow!("map service advertises no named layers"))?;
    let style = choose_style(layer, config.style.as_deref());
    info!(layer = %layer.name, "Creating WMS thumbnail");

    let extent = config
        .extent
        .or(layer.bbox)
        .unwrap_or([-180.0, -90.0, 180.0, 90.0]);
    let extent = padded_extent(extent, config.zoom_padding);
    let bbox = format!("{},{},{},{}", extent[0], extent[1], extent[2], extent[3]);

    let response = http
        .get(base_url)
        .query(&[
            ("service", "WMS"),
            ("version", "1.1.1"),
            ("request", "GetMap"),
            ("layers", layer.name.as_str()),
            ("styles", style.as_deref().unwrap_or("")),
            ("srs", config.projection.as_str()),
            ("bbox", bbox.as_str()),
            ("width", &config.width.to_string()),
            ("height", &config.height.to_string()),
            ("format", "image/png"),
            ("transparent", "FALSE"),
        ])
        .send()
        .await?
        .error_for_status()?;

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();
    if !content_type.starts_with("image/") {
        warn!(content_type = %content_type, "Map service did not return an image");
        return Err(anyhow!("GetMap returned {content_type}, not an image"));
    }

    let bytes = response.bytes().await?;
    Ok(format!("data:image/png;base64,{}", BASE64.encode(&bytes)))
}

/// Pad an extent on every side and clamp it to world bounds.
fn padded_extent(extent: [f64; 4], padding: f64) -> [f64; 4] {
    [
        (extent[0] - padding).max(-180.0),
        (extent[1] - padding).max(-90.0),
        (extent[2] + padding).min(180.0),
        (extent[3] + padding).min(90.0),
    ]
}

fn choose_layer<'a>(layers: &'a [WmsLayer], requested: Option<&str>) -> Option<&'a WmsLayer> {
    if let Some(name) = requested {
        if let Some(layer) = layers.iter().find(|layer| layer.name == name) {
            return Some(layer);
        }
        if !layers.is_empty() {
            info!(requested = %name, "Requested layer not advertised, using the first available");
        }
    }
    layers.first()
}

fn choose_style(layer: &WmsLayer, requested: Option<&str>) -> Option<String> {
    if let Some(name) = requested {
        if layer.styles.iter().any(|style| style == name) {
            return Some(name.to_string());
        }
    }
    layer.styles.first().cloned()
}

/// Parse the capabilities document into the advertised layer list.
fn parse_capabilities(xml: &str) -> Result<Vec<WmsLayer>> {
    let root = metadata_parser::parse_str(xml).context("unparseable capabilities document")?;
    let mut layers = Vec::new();
    if let Some(capability) = root.child("Capability") {
        collect_layers(capability, &mut layers);
    }
    Ok(layers)
}

fn collect_layers(element: &MetadataElement, out: &mut Vec<WmsLayer>) {
    for layer in element.children_named("Layer") {
        if let Some(name) = layer.child_text("Name") {
            out.push(WmsLayer {
                name: name.to_string(),
                styles: layer
                    .children_named("Style")
                    .iter()
                    .filter_map(|style| style.child_text("Name"))
                    .map(str::to_string)
                    .collect(),
                bbox: layer_bbox(layer),
            });
        }
        // container layers nest their children
        collect_layers(layer, out);
    }
}

fn layer_bbox(layer: &MetadataElement) -> Option<[f64; 4]> {
    if let Some(bbox) = layer.child("EX_GeographicBoundingBox") {
        return Some([
            bbox.child_text("westBoundLongitude")?.parse().ok()?,
            bbox.child_text("southBoundLatitude")?.parse().ok()?,
            bbox.child_text("eastBoundLongitude")?.parse().ok()?,
            bbox.child_text("northBoundLatitude")?.parse().ok()?,
        ]);
    }
    let bbox = layer.child("LatLonBoundingBox")?;
    Some([
        bbox.attr("minx")?.parse().ok()?,
        bbox.attr("miny")?.parse().ok()?,
        bbox.attr("maxx")?.parse().ok()?,
        bbox.attr("maxy")?.parse().ok()?,
    ])
}
