//! Bountyboard Metadata: fetch cache and storage clients
//!
//! Off-chain bounty and submission documents live in a content-addressed
//! store. This crate resolves them (with a process-lifetime cache) and
//! writes them.
pub mod cache;
pub mod codex;
pub mod memory;
pub mod source;
pub mod uploader;

pub use cache::{MetadataCache, DEFAULT_FETCH_TIMEOUT};
pub use codex::CodexBlobStore;
pub use memory::MemoryBlobStore;
pub use source::{HttpMetadataSource, StoreMetadataSource};
pub use uploader::MetadataUploader;
