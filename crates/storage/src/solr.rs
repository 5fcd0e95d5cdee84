//! Solr HTTP client.
//!
//! Thin wrapper over a single Solr core: JSON update and select endpoints,
//! optional basic auth, explicit timeouts. No automatic retry; transport
//! failures surface to the caller as store errors.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tracing::{debug, info};

use indexer_common::{CanonicalDocument, IndexerError, Result};

use crate::store::DocumentStore;

/// Connection settings for a Solr core.
#[derive(Debug, Clone)]
pub struct SolrConfig {
    /// Core URL, e.g. `http://localhost:8983/solr/datasets`
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Request timeout
    pub timeout: Duration,
    /// Commit after every update instead of relying on autocommit
    pub always_commit: bool,
}

impl Default for SolrConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8983/solr/datasets".to_string(),
            username: None,
            password: None,
            timeout: Duration::from_secs(120),
            always_commit: false,
        }
    }
}

/// Client for one Solr core.
pub struct SolrClient {
    http: Client,
    config: SolrConfig,
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    response: SelectBody,
}

#[derive(Debug, Deserialize)]
struct SelectBody {
    docs: Vec<CanonicalDocument>,
}

impl SolrClient {
    pub fn new(config: SolrConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IndexerError::InvalidConfig(format!("HTTP client: {e}")))?;

        info!(core = %config.base_url, "Connected Solr client");
        Ok(Self { http, config })
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_deref()),
            None => request,
        }
    }

    fn update_url(&self) -> String {
        format!("{}/update", self.config.base_url)
    }

    /// Add documents to the index, replacing existing documents with the
    /// same id. Empty multi-valued fields are dropped from the payload.
    pub async fn add(&self, docs: &[CanonicalDocument]) -> Result<()> {
        let payload: Vec<CanonicalDocument> = docs
            .iter()
            .map(|doc| {
                let mut doc = doc.clone();
                doc.prune_empty();
                doc
            })
            .collect();

        let mut request = self.http.post(self.update_url()).json(&payload);
        if self.config.always_commit {
            request = request.query(&[("commit", "true")]);
        }

        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| IndexerError::StoreWrite(e.to_string()))?;
        check_status(response, IndexerError::StoreWrite).await?;

        debug!(count = payload.len(), "Added documents to index");
        Ok(())
    }

    /// Fetch every document whose id matches exactly.
    pub async fn search_by_id(&self, id: &str) -> Result<Vec<CanonicalDocument>> {
        let query = format!("id:\"{id}\"");
        let request = self
            .http
            .get(format!("{}/select", self.config.base_url))
            .query(&[("q", query.as_str()), ("wt", "json"), ("rows", "100")]);

        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| IndexerError::StoreRead(e.to_string()))?;
        let response = check_status(response, IndexerError::StoreRead).await?;

        let body: SelectResponse = response
            .json()
            .await
            .map_err(|e| IndexerError::StoreRead(format!("response decode: {e}")))?;
        Ok(body.response.docs)
    }

    /// Delete the document with the given id.
    pub async fn delete_by_id(&self, id: &str) -> Result<()> {
        let payload = serde_json::json!({ "delete": { "query": format!("id:\"{id}\"") } });

        let mut request = self.http.post(self.update_url()).json(&payload);
        if self.config.always_commit {
            request = request.query(&[("commit", "true")]);
        }

        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| IndexerError::StoreWrite(e.to_string()))?;
        check_status(response, IndexerError::StoreWrite).await?;

        info!(id = %id, "Deleted document from index");
        Ok(())
    }

    /// Send an explicit commit.
    pub async fn commit(&self) -> Result<()> {
        let request = self
            .http
            .post(self.update_url())
            .query(&[("commit", "true")])
            .json(&serde_json::json!({}));

        let response = self
            .with_auth(request)
            .send()
            .await
            .map_err(|e| IndexerError::StoreWrite(e.to_string()))?;
        check_status(response, IndexerError::StoreWrite).await?;
        Ok(())
    }
}

async fn check_status(
    response: reqwest::Response,
    wrap: fn(String) -> IndexerError,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(wrap(format!("HTTP {status}: {body}")))
}

#[async_trait]
impl DocumentStore for SolrClient {
    async fn fetch_by_id(&self, id: &str) -> Result<Vec<CanonicalDocument>> {
        self.search_by_id(id).await
    }

    async fn write(&self, doc: &CanonicalDocument) -> Result<()> {
        self.add(std::slice::from_ref(doc)).await
    }
}
