//! JSON documents written to the storage service
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::data_model::{Address, BountyForm};

pub const BOUNTY_FORMAT: &str = "bountyboard-v1";
pub const DOCUMENT_VERSION: &str = "1.0";
pub const SUBMISSION_TYPE: &str = "bounty_submission";

/// Bounty metadata document, content-addressed by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BountyDocument {
    pub title: String,
    pub description: String,
    pub reward: String,
    pub deadline: String,
    pub created_at: String,
    pub created_by: Option<Address>,
    pub status: String,
    pub version: String,
    pub format: String,
    pub metadata: BountyDocumentInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BountyDocumentInfo {
    pub platform: String,
    pub network: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl BountyDocument {
    pub fn from_form(
        form: &BountyForm,
        creator: Option<&Address>,
        platform: &str,
        network: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            title: form.title.clone(),
            description: form.description.clone(),
            reward: form.reward.clone(),
            deadline: form.deadline.clone(),
            created_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            created_by: creator.cloned(),
            status: "open".to_string(),
            version: DOCUMENT_VERSION.to_string(),
            format: BOUNTY_FORMAT.to_string(),
            metadata: BountyDocumentInfo {
                platform: platform.to_string(),
                network: network.to_string(),
                tags: form.tags.clone(),
            },
        }
    }
}

/// Hunter's work description document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDocument {
    #[serde(rename = "type")]
    pub doc_type: String,
    pub title: String,
    pub description: String,
    pub submitter_address: Address,
    pub submitted_at: String,
    pub metadata: SubmissionDocumentInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionDocumentInfo {
    pub version: String,
    pub platform: String,
    pub timestamp: i64,
}

impl SubmissionDocument {
    /// Title and description are trimmed; a missing submitter becomes the
    /// zero address.
    pub fn new(
        title: &str,
        description: &str,
        submitter: Option<&Address>,
        platform: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            doc_type: SUBMISSION_TYPE.to_string(),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            submitter_address: submitter.cloned().unwrap_or_else(Address::zero),
            submitted_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
            metadata: SubmissionDocumentInfo {
                version: DOCUMENT_VERSION.to_string(),
                platform: platform.to_string(),
                timestamp: now.timestamp_millis(),
            },
        }
    }

    pub fn is_submission(&self) -> bool {
        self.doc_type == SUBMISSION_TYPE
    }
}
