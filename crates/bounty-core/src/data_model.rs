//! Data Model: chain records, off-chain metadata and the enriched view model
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::units::{format_units, REWARD_DECIMALS};

pub type BountyId = u64;

/// Placeholder title while a bounty is being resolved.
pub const LOADING_TITLE: &str = "Loading...";
/// Placeholder description while a bounty is being resolved.
pub const LOADING_DESCRIPTION: &str = "Fetching bounty details...";
/// Description used when metadata could not be loaded.
pub const FALLBACK_DESCRIPTION: &str = "No description available";
/// Per-bounty error surfaced when metadata resolution fails.
pub const METADATA_ERROR: &str = "Failed to load metadata";

/// Hex account address. Comparisons between addresses are case-insensitive
/// through [`Address::same_as`]; the stored string is kept as received.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn zero() -> Self {
        Self("0x0000000000000000000000000000000000000000".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn same_as(&self, other: &Address) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Address {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// On-chain bounty status. Numeric values match the contract enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BountyStatus {
    Active = 0,
    Completed = 1,
    Cancelled = 2,
}

impl BountyStatus {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Active),
            1 => Some(Self::Completed),
            2 => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for BountyStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Bounty record as read from the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBounty {
    pub id: BountyId,
    pub creator: Address,
    /// Reward in the token's smallest unit
    pub amount: u128,
    pub status: BountyStatus,
    pub metadata_cid: String,
}

/// The four parallel arrays returned by `getAllActiveBounties`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveBountyArrays {
    pub ids: Vec<BountyId>,
    pub creators: Vec<Address>,
    pub amounts: Vec<u128>,
    pub metadata_cids: Vec<String>,
}

impl ActiveBountyArrays {
    pub fn is_consistent(&self) -> bool {
        let len = self.ids.len();
        self.creators.len() == len && self.amounts.len() == len && self.metadata_cids.len() == len
    }
}

/// Off-chain metadata keyed by content identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub deadline: Option<String>,
}

impl BountyMetadata {
    /// Lenient parse of an untyped storage document.
    ///
    /// Missing fields default to empty, unknown fields are ignored and tags are
    /// accepted either at the top level or under `metadata.tags`. Anything that
    /// is not a JSON object yields `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;
        let text = |key: &str| {
            obj.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };

        let tags = obj
            .get("tags")
            .or_else(|| obj.get("metadata").and_then(|m| m.get("tags")))
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(|t| t.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();

        let deadline = obj
            .get("deadline")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .map(str::to_string);

        Some(Self {
            title: text("title"),
            description: text("description"),
            tags,
            deadline,
        })
    }

    /// Parse raw bytes; malformed JSON yields `None`, never an error.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice::<Value>(bytes)
            .ok()
            .and_then(|v| Self::from_value(&v))
    }
}

/// A hunter's submission. The contract keeps at most one per (bounty, hunter).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Submission {
    pub hunter: Address,
    pub description_cid: String,
}

/// View model merged from chain truth and off-chain metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedBounty {
    pub id: BountyId,
    pub title: String,
    pub description: String,
    /// Decimal string, 6-decimal scale
    pub reward: String,
    pub tags: Vec<String>,
    pub deadline: Option<String>,
    pub creator: Address,
    /// Submission count from the contract
    pub applicants: u64,
    pub status: BountyStatus,
    pub metadata_cid: String,
    pub raw_amount: u128,
    pub is_loading: bool,
    pub is_loading_submissions: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_error: Option<String>,
    pub has_user_submitted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_submission: Option<Submission>,
}

impl EnhancedBounty {
    /// Initial record shown while metadata and submissions load. The reward is
    /// already final since it only depends on the raw amount.
    pub fn loading(raw: &RawBounty) -> Self {
        Self {
            id: raw.id,
            title: LOADING_TITLE.to_string(),
            description: LOADING_DESCRIPTION.to_string(),
            reward: format_units(raw.amount, REWARD_DECIMALS),
            tags: Vec::new(),
            deadline: None,
            creator: raw.creator.clone(),
            applicants: 0,
            status: raw.status,
            metadata_cid: raw.metadata_cid.clone(),
            raw_amount: raw.amount,
            is_loading: true,
            is_loading_submissions: true,
            metadata_error: None,
            has_user_submitted: false,
            user_submission: None,
        }
    }

    /// Fill in resolved metadata. Empty or missing title and description fall
    /// back to id-based placeholders so a loaded bounty never shows a sentinel.
    pub fn apply_metadata(&mut self, metadata: Option<&BountyMetadata>) {
        match metadata {
            Some(meta) => {
                self.title = non_empty_or(&meta.title, || format!("Bounty #{}", self.id));
                self.description = non_empty_or(&meta.description, || FALLBACK_DESCRIPTION.to_string());
                self.tags = meta.tags.clone();
                self.deadline = meta.deadline.clone();
                self.metadata_error = None;
            }
            None => {
                self.title = format!("Bounty #{}", self.id);
                self.description = FALLBACK_DESCRIPTION.to_string();
                self.tags = Vec::new();
                self.deadline = None;
                self.metadata_error = Some(METADATA_ERROR.to_string());
            }
        }
        self.is_loading = false;
    }

    /// Fill in submission count and the viewer's own submission.
    pub fn apply_submissions(&mut self, count: u64, user_submission: Option<Submission>) {
        self.applicants = count;
        self.has_user_submitted = user_submission.is_some();
        self.user_submission = user_submission;
        self.is_loading_submissions = false;
    }

    pub fn is_active(&self) -> bool {
        self.status == BountyStatus::Active
    }
}

fn non_empty_or(value: &str, fallback: impl FnOnce() -> String) -> String {
    if value.trim().is_empty() {
        fallback()
    } else {
        value.to_string()
    }
}

/// Transaction handle returned by a contract write.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHash(pub String);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Confirmation record for a mined transaction. Being mined says nothing
/// about success; check `status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: TxHash,
    pub status: ReceiptStatus,
    pub block_number: u64,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Create-bounty form as typed by the creator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyForm {
    pub title: String,
    pub description: String,
    /// Decimal reward, e.g. "12.5"
    pub reward: String,
    /// ISO date or RFC 3339 timestamp
    pub deadline: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Submit-to-bounty form as typed by the hunter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionForm {
    pub bounty_id: BountyId,
    pub title: String,
    pub description: String,
}
