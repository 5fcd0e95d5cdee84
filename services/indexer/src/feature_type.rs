//! Feature-type probe against the dataset access service.
//!
//! Datasets exposed over OPeNDAP publish their sampling geometry as a
//! `featureType` global attribute; the attribute document is fetched and
//! scanned as text. Unavailability is non-fatal: the caller simply omits
//! the field.

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::{info, warn};

/// Sampling-geometry labels the index schema recognizes.
pub const KNOWN_FEATURE_TYPES: &[&str] = &[
    "point",
    "timeSeries",
    "trajectory",
    "profile",
    "timeSeriesProfile",
    "trajectoryProfile",
];

/// Fetch and normalize the feature type for a dataset access URL.
pub async fn fetch_feature_type(http: &Client, access_url: &str) -> Result<String> {
    let url = format!("{access_url}.das");
    info!(url = %url, "Probing feature type");

    let body = http
        .get(&url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let label = extract_feature_type(&body)
        .context("no featureType attribute in the attribute document")?;
    let label = normalize_label(&label);

    if !KNOWN_FEATURE_TYPES.contains(&label.as_str()) {
        warn!(feature_type = %label, "Feature type is not a known label, passing through");
    }
    Ok(label)
}

/// Normalize case-variant spellings seen in the wild.
fn normalize_label(label: &str) -> String {
    match label {
        "TimeSeries" | "timeseries" | "timseries" => "timeSeries".to_string(),
        other => other.to_string(),
    }
}

/// Scan an attribute document for the global `featureType` attribute.
///
/// The relevant line has the form `String featureType "timeSeries";`.
fn extract_feature_type(das: &str) -> Option<String> {
    for line in das.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("String featureType") {
            return rest.split('"').nth(1).map(str::to_string);
        }
    }
    None
}
