//! HTTP client for a Codex-style storage node
//!
//! `POST {endpoint}/data` stores bytes and answers with the identifier as
//! plain text. Reads try the node's local store first and fall back to
//! fetching from the network.
use std::time::Duration;

use async_trait::async_trait;
use bounty_core::config::StorageConfig;
use bounty_core::{BlobStore, BountyError, PersistenceOptions, Result};
use reqwest::{header, Client, StatusCode};
use tracing::{debug, info, warn};

pub struct CodexBlobStore {
    endpoint: String,
    client: Client,
}

impl CodexBlobStore {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BountyError::Config(format!("cannot build storage client: {}", e)))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        Self::new(config.endpoint.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_from(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| BountyError::Network(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let bytes = response
                    .bytes()
                    .await
                    .map_err(|e| BountyError::Network(e.to_string()))?;
                Ok(Some(bytes.to_vec()))
            }
            status => Err(BountyError::Network(format!("storage node returned {}", status))),
        }
    }
}

#[async_trait]
impl BlobStore for CodexBlobStore {
    async fn put(&self, bytes: Vec<u8>, content_type: &str, filename: &str) -> Result<String> {
        let size = bytes.len();
        let response = self
            .client
            .post(format!("{}/data", self.endpoint))
            .header(header::CONTENT_TYPE, content_type)
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            )
            .body(bytes)
            .send()
            .await
            .map_err(|e| BountyError::UploadFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BountyError::UploadFailed(e.to_string()))?;
        if !status.is_success() {
            return Err(BountyError::UploadFailed(format!("{} {}", status, body.trim())));
        }

        let cid = body.trim().to_string();
        if cid.is_empty() {
            return Err(BountyError::UploadFailed("storage node returned no identifier".to_string()));
        }
        info!(cid = %cid, size, filename, "blob stored");
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> Result<Option<Vec<u8>>> {
        let local = format!("{}/data/{}", self.endpoint, cid);
        match self.get_from(&local).await {
            Ok(Some(bytes)) => return Ok(Some(bytes)),
            Ok(None) => debug!(cid, "not in local store, trying network"),
            Err(e) => warn!(cid, error = %e, "local read failed, trying network"),
        }

        self.get_from(&format!("{}/data/{}/network/stream", self.endpoint, cid))
            .await
    }

    async fn request_persistence(&self, cid: &str, options: &PersistenceOptions) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/storage/request/{}", self.endpoint, cid))
            .json(options)
            .send()
            .await
            .map_err(|e| BountyError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BountyError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(BountyError::Network(format!(
                "persistence request returned {}: {}",
                status,
                body.trim()
            )));
        }
        Ok(body.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trailing_slash_trimmed() {
        let store = CodexBlobStore::new("http://node:8080/api/codex/v1/", Duration::from_secs(1)).unwrap();
        assert_eq!(store.endpoint(), "http://node:8080/api/codex/v1");
    }
}
