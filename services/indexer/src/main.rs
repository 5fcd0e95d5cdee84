//! Dataset metadata indexer service.
//!
//! Parses dataset metadata records (XML), transforms them into flat
//! search-index documents, and maintains the parent/child dataset
//! hierarchy in the index across repeated runs. Batch runs keep going
//! after any single-record failure.

mod config;
mod feature_type;
mod thumbnail;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use walkdir::WalkDir;

use indexer_common::CanonicalDocument;
use indexing::{link_child, transform, DatasetLevel, LinkOutcome};
use storage::SolrClient;

use config::IndexerConfig;
use thumbnail::ThumbnailConfig;

#[derive(Parser, Debug)]
#[command(name = "indexer")]
#[command(about = "Dataset metadata indexer for the search catalog")]
struct Args {
    /// Metadata XML file(s) or directories to index
    #[arg(required_unless_present = "delete")]
    inputs: Vec<String>,

    /// Dataset level: 1 (parent/standalone) or 2 (child)
    #[arg(short, long, default_value_t = 1)]
    level: u8,

    /// Commit to the index after every write
    #[arg(long)]
    always_commit: bool,

    /// Skip thumbnail generation
    #[arg(long)]
    no_thumbnail: bool,

    /// WMS layer for thumbnails
    #[arg(long)]
    wms_layer: Option<String>,

    /// WMS style for thumbnails
    #[arg(long)]
    wms_style: Option<String>,

    /// Padding in degrees added around the thumbnail extent
    #[arg(long, default_value_t = 0.0)]
    wms_zoom: f64,

    /// CRS code for thumbnail requests
    #[arg(long, default_value = "EPSG:4326")]
    projection: String,

    /// Thumbnail extent override: west,south,east,north
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    thumbnail_extent: Option<Vec<f64>>,

    /// Delete the document with this id instead of indexing
    #[arg(long)]
    delete: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// What happened to one record of a batch.
enum RecordOutcome {
    Indexed,
    Skipped,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config = IndexerConfig::from_env(args.always_commit)?;
    let solr = SolrClient::new(config.solr.clone())?;

    if let Some(id) = &args.delete {
        let level = DatasetLevel::from_arg(args.level)?;
        info!(id = %id, level = level.tag(), "Deleting document from index");
        solr.delete_by_id(id).await?;
        return Ok(());
    }

    let level = DatasetLevel::from_arg(args.level)?;
    let files = collect_input_files(&args.inputs);
    if files.is_empty() {
        warn!("No metadata files found in the given inputs");
        return Ok(());
    }
    info!(files = files.len(), level = level.tag(), "Starting ingestion run");

    let http = Client::builder()
        .timeout(config.wms_timeout.max(config.dap_timeout))
        .connect_timeout(Duration::from_secs(30))
        .build()
        .context("Failed to create HTTP client")?;

    let thumbnail_config = thumbnail_config_from(&args);

    let mut indexed = 0usize;
    let mut skipped = 0usize;
    let mut failed = 0usize;
    for file in &files {
        match process_file(file, level, &solr, &http, &thumbnail_config, args.no_thumbnail).await {
            Ok(RecordOutcome::Indexed) => indexed += 1,
            Ok(RecordOutcome::Skipped) => skipped += 1,
            Err(e) => {
                failed += 1;
                error!(file = %file, error = %e, "Record failed, continuing with the rest");
            }
        }
    }

    if !config.solr.always_commit && indexed > 0 {
        solr.commit().await?;
    }

    info!(indexed, skipped, failed, "Ingestion run complete");
    Ok(())
}

fn thumbnail_config_from(args: &Args) -> ThumbnailConfig {
    let extent = args.thumbnail_extent.as_ref().and_then(|values| {
        let values: [f64; 4] = values.as_slice().try_into().ok()?;
        Some(values)
    });
    ThumbnailConfig {
        layer: args.wms_layer.clone(),
        style: args.wms_style.clone(),
        zoom_padding: args.wms_zoom,
        projection: args.projection.clone(),
        extent,
        ..ThumbnailConfig::default()
    }
}

/// Expand file and directory inputs into a sorted list of XML files.
fn collect_input_files(inputs: &[String]) -> Vec<String> {
    let mut files = Vec::new();
    for input in inputs {
        let path = std::path::Path::new(input);
        if path.is_dir() {
            for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file()
                    && entry
                        .path()
                        .extension()
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("xml"))
                {
                    files.push(entry.path().display().to_string());
                }
            }
        } else {
            files.push(input.clone());
        }
    }
    files.sort();
    files
}

/// Run one record through the pipeline: parse, validate, transform, probe
/// collaborators, then write (level 1) or link (level 2).
async fn process_file(
    path: &str,
    level: DatasetLevel,
    solr: &SolrClient,
    http: &Client,
    thumbnail_config: &ThumbnailConfig,
    no_thumbnail: bool,
) -> Result<RecordOutcome> {
    info!(file = %path, "Processing metadata record");

    let raw = std::fs::read_to_string(path)?;
    let mut record = metadata_parser::parse_str(&raw)
        .map_err(|e| indexer_common::IndexerError::XmlParse(e.to_string()))?;

    indexing::vocab::validate(&mut record);
    let mut doc = transform(&record, &raw, level)?;

    // source-flagged inactive records are never written
    if doc.str_value("metadata_status") == Some("Inactive") {
        warn!(id = ?doc.id(), "Skipping inactive record");
        return Ok(RecordOutcome::Skipped);
    }

    attach_feature_type(&mut doc, http).await;
    if !no_thumbnail {
        attach_thumbnail(&mut doc, http, thumbnail_config).await;
    }

    match level {
        DatasetLevel::Level1 => {
            solr.add(std::slice::from_ref(&doc)).await?;
            info!(id = ?doc.id(), "Record successfully added");
            Ok(RecordOutcome::Indexed)
        }
        DatasetLevel::Level2 => {
            if doc.contains("related_dataset") {
                match link_child(&doc, solr).await? {
                    LinkOutcome::Linked => {
                        info!(id = ?doc.id(), "Child record added and parent updated");
                        Ok(RecordOutcome::Indexed)
                    }
                    LinkOutcome::ParentNotFound | LinkOutcome::ParentAmbiguous => {
                        Ok(RecordOutcome::Skipped)
                    }
                }
            } else {
                warn!(id = ?doc.id(), "Child record with no parent reference, indexing without link");
                solr.add(std::slice::from_ref(&doc)).await?;
                Ok(RecordOutcome::Indexed)
            }
        }
    }
}

/// Probe the dataset access service for the sampling geometry; absence is
/// non-fatal and just leaves the field out.
async fn attach_feature_type(doc: &mut CanonicalDocument, http: &Client) {
    let Some(url) = doc.str_value("data_access_url_opendap").map(str::to_string) else {
        return;
    };
    match feature_type::fetch_feature_type(http, &url).await {
        Ok(label) => {
            info!(feature_type = %label, "Feature type found");
            doc.set_str("feature_type", label);
        }
        Err(e) => warn!(error = %e, "Could not retrieve feature type"),
    }
}

/// Fetch a map thumbnail for WMS-backed datasets. On failure the WMS
/// access field is dropped so the portal does not advertise a broken
/// endpoint.
async fn attach_thumbnail(
    doc: &mut CanonicalDocument,
    http: &Client,
    config: &ThumbnailConfig,
) {
    let Some(url) = doc.str_value("data_access_url_ogc_wms").map(str::to_string) else {
        return;
    };
    match thumbnail::fetch_thumbnail(http, &url, config).await {
        Ok(data) => {
            doc.set_str("thumbnail_data", data);
        }
        Err(e) => {
            warn!(error = %e, "Could not create thumbnail, dropping WMS access field");
            doc.remove("data_access_url_ogc_wms");
        }
    }
}
