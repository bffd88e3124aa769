//! Content-addressed storage and metadata-resolution boundaries
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::PersistenceOptions;
use crate::error::Result;

/// Opaque blob store. The same bytes always map to the same identifier.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bytes: Vec<u8>, content_type: &str, filename: &str) -> Result<String>;

    /// `Ok(None)` when the identifier is unknown
    async fn get(&self, cid: &str) -> Result<Option<Vec<u8>>>;

    /// Best-effort durability request; returns the request id
    async fn request_persistence(&self, cid: &str, options: &PersistenceOptions) -> Result<String>;
}

/// Body of `GET /metadata?cid=`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
}

impl MetadataResponse {
    pub fn ok(cid: &str, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            cid: Some(cid.to_string()),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            cid: None,
        }
    }
}

/// Resolves a content identifier to its metadata envelope. Non-success HTTP
/// statuses surface as `Err`.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn resolve(&self, cid: &str) -> Result<MetadataResponse>;
}
