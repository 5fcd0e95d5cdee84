//! Indexer service configuration.

use std::env;
use std::time::Duration;

use anyhow::Result;

use storage::SolrConfig;

/// Top-level indexer configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Document store connection
    pub solr: SolrConfig,

    /// Timeout for map-service (WMS) requests
    pub wms_timeout: Duration,

    /// Timeout for dataset-access-service (OPeNDAP) requests
    pub dap_timeout: Duration,
}

impl IndexerConfig {
    /// Load configuration from environment variables with defaults.
    pub fn from_env(always_commit: bool) -> Result<Self> {
        let defaults = SolrConfig::default();
        let solr = SolrConfig {
            base_url: env::var("SOLR_URL").unwrap_or(defaults.base_url),
            username: env::var("SOLR_USERNAME").ok(),
            password: env::var("SOLR_PASSWORD").ok(),
            timeout: env_secs("SOLR_TIMEOUT_SECS", 120),
            always_commit,
        };

        Ok(Self {
            solr,
            wms_timeout: env_secs("WMS_TIMEOUT_SECS", 120),
            dap_timeout: env_secs("DAP_TIMEOUT_SECS", 30),
        })
    }
}

fn env_secs(name: &str, default: u64) -> Duration {
    let secs = env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = IndexerConfig::from_env(true).unwrap();
        assert!(config.solr.always_commit);
        assert_eq!(config.dap_timeout, Duration::from_secs(30));
    }
}
