//! Bountyboard Chain: read access to the escrow contract
//!
//! [`ChainReader`] wraps any [`bounty_core::BountyContract`] with the board's
//! read semantics. [`MockChain`] simulates the contract and its reward token
//! in memory.

pub mod mock;
pub mod reader;

pub use mock::{MockChain, MOCK_CONTRACT_ADDRESS, MOCK_TOKEN_ADDRESS};
pub use reader::ChainReader;
