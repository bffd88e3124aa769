//! Bountyboard Core: data model, errors, configuration and boundaries
//!
//! Shared by every crate in the workspace. Chain, storage and metadata
//! services are reached only through the async traits in [`chain`] and
//! [`storage`], so the reconciliation logic never depends on a transport.

pub mod chain;
pub mod config;
pub mod data_model;
pub mod documents;
pub mod error;
pub mod logging;
pub mod observer;
pub mod storage;
pub mod units;

pub use chain::{BountyContract, ReceiptSource, RewardToken};
pub use config::{BoardConfig, LoggingConfig, PersistenceOptions};
pub use data_model::{
    ActiveBountyArrays, Address, BountyForm, BountyId, BountyMetadata, BountyStatus,
    EnhancedBounty, RawBounty, Receipt, ReceiptStatus, Submission, SubmissionForm, TxHash,
};
pub use documents::{BountyDocument, SubmissionDocument};
pub use error::{BountyError, ErrorKind, Result};
pub use observer::BoardObserver;
pub use storage::{BlobStore, MetadataResponse, MetadataSource};
pub use units::{format_units, parse_units, REWARD_DECIMALS};

/// Board engine version
pub const BOARD_VERSION: &str = "1.0.0";
