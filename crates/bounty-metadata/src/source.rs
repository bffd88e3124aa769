//! Metadata sources: the HTTP resolution endpoint, or a blob store directly
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bounty_core::config::MetadataConfig;
use bounty_core::{BlobStore, BountyError, MetadataResponse, MetadataSource, Result};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Client for `GET {endpoint}/metadata?cid=`.
pub struct HttpMetadataSource {
    endpoint: String,
    client: Client,
}

impl HttpMetadataSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BountyError::Config(format!("cannot build metadata client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &MetadataConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), config.timeout())
    }
}

#[async_trait]
impl MetadataSource for HttpMetadataSource {
    async fn resolve(&self, cid: &str) -> Result<MetadataResponse> {
        let response = self
            .client
            .get(format!("{}/metadata", self.endpoint))
            .query(&[("cid", cid)])
            .send()
            .await
            .map_err(|e| BountyError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BountyError::Network(format!("metadata service returned {}", status)));
        }

        response
            .json::<MetadataResponse>()
            .await
            .map_err(|e| BountyError::Decode(e.to_string()))
    }
}

/// Resolves metadata by reading the blob and parsing it as JSON.
pub struct StoreMetadataSource {
    store: Arc<dyn BlobStore>,
}

impl StoreMetadataSource {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl MetadataSource for StoreMetadataSource {
    async fn resolve(&self, cid: &str) -> Result<MetadataResponse> {
        let bytes = self
            .store
            .get(cid)
            .await?
            .ok_or_else(|| BountyError::NotFound(format!("no content for {}", cid)))?;
        let data: Value = serde_json::from_slice(&bytes)?;
        debug!(cid, size = bytes.len(), "metadata read from store");
        Ok(MetadataResponse::ok(cid, data))
    }
}
