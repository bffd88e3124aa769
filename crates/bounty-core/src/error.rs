//! Unified Error Model
//!
//! Every boundary call (storage, metadata, chain read/write) ends up as one of
//! these variants. `Display` is the prose shown to the user, `kind()` keeps the
//! machine-readable category.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_model::BountyId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BountyError {
    #[error("VALIDATION/{0}")]
    Validation(String),

    #[error("WALLET/Please connect your wallet first")]
    NotConnected,

    #[error("BALANCE/Insufficient reward token balance: need {required}, have {available}")]
    InsufficientBalance { required: String, available: String },

    #[error("SUBMIT/You have already submitted to this bounty")]
    AlreadySubmitted,

    #[error("SUBMIT/You cannot submit to your own bounty")]
    SelfSubmission,

    #[error("SUBMIT/Bounty #{0} is not active")]
    InactiveBounty(BountyId),

    #[error("UPLOAD/upload failed: {0}")]
    UploadFailed(String),

    #[error("TX/{0}")]
    Transaction(String),

    #[error("TX/Transaction {tx_hash} was processed but failed. Check your wallet for details.")]
    TransactionReverted { tx_hash: String },

    #[error("TX/Network error while confirming {tx_hash}: {reason}. The transaction may have succeeded - please check your wallet before retrying.")]
    AmbiguousConfirmation { tx_hash: String, reason: String },

    #[error("CONFIG/Contract not found at address {0}")]
    ContractNotFound(String),

    #[error("NET/{0}")]
    Network(String),

    #[error("DECODE/{0}")]
    Decode(String),

    #[error("NOTFOUND/{0}")]
    NotFound(String),

    #[error("CONFIG/{0}")]
    Config(String),

    #[error("WORKFLOW/A transaction is already in progress")]
    Busy,

    #[error("WORKFLOW/Workflow was reset before it finished")]
    Abandoned,
}

/// Category tag preserved alongside the prose message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotConnected,
    InsufficientBalance,
    AlreadySubmitted,
    SelfSubmission,
    InactiveBounty,
    UploadFailed,
    Transaction,
    TransactionReverted,
    AmbiguousConfirmation,
    ContractNotFound,
    Network,
    Decode,
    NotFound,
    Config,
    Busy,
    Abandoned,
}

impl BountyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotConnected => ErrorKind::NotConnected,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::AlreadySubmitted => ErrorKind::AlreadySubmitted,
            Self::SelfSubmission => ErrorKind::SelfSubmission,
            Self::InactiveBounty(_) => ErrorKind::InactiveBounty,
            Self::UploadFailed(_) => ErrorKind::UploadFailed,
            Self::Transaction(_) => ErrorKind::Transaction,
            Self::TransactionReverted { .. } => ErrorKind::TransactionReverted,
            Self::AmbiguousConfirmation { .. } => ErrorKind::AmbiguousConfirmation,
            Self::ContractNotFound(_) => ErrorKind::ContractNotFound,
            Self::Network(_) => ErrorKind::Network,
            Self::Decode(_) => ErrorKind::Decode,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Config(_) => ErrorKind::Config,
            Self::Busy => ErrorKind::Busy,
            Self::Abandoned => ErrorKind::Abandoned,
        }
    }

    /// Transaction hash attached to the failure, if the chain saw one.
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            Self::TransactionReverted { tx_hash } | Self::AmbiguousConfirmation { tx_hash, .. } => {
                Some(tx_hash)
            }
            _ => None,
        }
    }

    /// Configuration-level failures are never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ContractNotFound(_) | Self::Config(_))
    }
}

impl From<serde_json::Error> for BountyError {
    fn from(err: serde_json::Error) -> Self {
        BountyError::Decode(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BountyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_keeps_category_prefix() {
        let err = BountyError::AlreadySubmitted;
        assert_eq!(
            err.to_string(),
            "SUBMIT/You have already submitted to this bounty"
        );
        assert_eq!(err.kind(), ErrorKind::AlreadySubmitted);
    }

    #[test]
    fn test_revert_and_ambiguous_are_distinct() {
        let reverted = BountyError::TransactionReverted {
            tx_hash: "0xabc".to_string(),
        };
        let ambiguous = BountyError::AmbiguousConfirmation {
            tx_hash: "0xabc".to_string(),
            reason: "transport closed".to_string(),
        };

        assert_ne!(reverted.kind(), ambiguous.kind());
        assert_eq!(reverted.tx_hash(), Some("0xabc"));
        assert!(ambiguous.to_string().contains("may have succeeded"));
    }

    #[test]
    fn test_fatal_errors() {
        assert!(BountyError::ContractNotFound("0x0".to_string()).is_fatal());
        assert!(!BountyError::Network("timeout".to_string()).is_fatal());
    }
}
