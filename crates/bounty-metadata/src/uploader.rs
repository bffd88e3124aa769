//! Upload and retrieval of bounty and submission documents
use std::sync::Arc;

use bounty_core::config::StorageConfig;
use bounty_core::{
    BlobStore, BountyDocument, BountyError, PersistenceOptions, Result, SubmissionDocument,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

const JSON: &str = "application/json";

#[derive(Clone)]
pub struct MetadataUploader {
    store: Arc<dyn BlobStore>,
    persistence: Option<PersistenceOptions>,
}

impl MetadataUploader {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            persistence: None,
        }
    }

    pub fn from_config(store: Arc<dyn BlobStore>, config: &StorageConfig) -> Self {
        let uploader = Self::new(store);
        if config.request_persistence {
            uploader.with_persistence(config.persistence.clone())
        } else {
            uploader
        }
    }

    /// Ask the store to persist every upload. Failures only log.
    pub fn with_persistence(mut self, options: PersistenceOptions) -> Self {
        self.persistence = Some(options);
        self
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        &self.store
    }

    pub async fn upload_bounty(&self, document: &BountyDocument) -> Result<String> {
        let missing: Vec<&str> = [
            ("title", &document.title),
            ("description", &document.description),
            ("reward", &document.reward),
            ("deadline", &document.deadline),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
        if !missing.is_empty() {
            return Err(BountyError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        self.upload_json(document, "bounty-metadata.json").await
    }

    pub async fn upload_submission(&self, document: &SubmissionDocument) -> Result<String> {
        if !document.is_submission() {
            return Err(BountyError::Validation(format!(
                "Unexpected document type {}",
                document.doc_type
            )));
        }
        if document.description.trim().is_empty() {
            return Err(BountyError::Validation("Missing required fields: description".to_string()));
        }

        let filename = format!("submission-{}.json", document.metadata.timestamp);
        self.upload_json(document, &filename).await
    }

    /// Raw bounty document; parsed leniently by callers.
    pub async fn retrieve_bounty(&self, cid: &str) -> Result<Value> {
        let bytes = self.fetch(cid).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn retrieve_submission(&self, cid: &str) -> Result<SubmissionDocument> {
        let bytes = self.fetch(cid).await?;
        let document: SubmissionDocument = serde_json::from_slice(&bytes)?;
        if !document.is_submission() {
            return Err(BountyError::Decode(format!("{} is not a submission document", cid)));
        }
        Ok(document)
    }

    async fn fetch(&self, cid: &str) -> Result<Vec<u8>> {
        self.store
            .get(cid)
            .await?
            .ok_or_else(|| BountyError::NotFound(format!("no content for {}", cid)))
    }

    async fn upload_json(&self, document: &impl Serialize, filename: &str) -> Result<String> {
        let bytes = serde_json::to_vec_pretty(document)?;
        let size = bytes.len();

        let cid = self.store.put(bytes, JSON, filename).await.map_err(|e| match e {
            BountyError::UploadFailed(_) => e,
            other => BountyError::UploadFailed(other.to_string()),
        })?;
        info!(cid = %cid, size, filename, "document uploaded");

        if let Some(options) = &self.persistence {
            match self.store.request_persistence(&cid, options).await {
                Ok(request_id) => info!(cid = %cid, request_id = %request_id, "persistence requested"),
                Err(e) => warn!(cid = %cid, error = %e, "persistence request failed, upload kept"),
            }
        }
        Ok(cid)
    }
}
