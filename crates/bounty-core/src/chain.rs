//! Contract and token boundaries consumed by the board.
//!
//! The escrow contract's state machine is authoritative; these traits only
//! expose the calls the board makes. Writes take the signing account as
//! `from` and return as soon as the transaction is broadcast; use
//! [`ReceiptSource`] to learn the outcome.
use async_trait::async_trait;

use crate::data_model::{ActiveBountyArrays, Address, BountyId, RawBounty, Receipt, Submission, TxHash};
use crate::error::Result;

#[async_trait]
pub trait BountyContract: Send + Sync {
    /// Deployed address, used as the allowance spender
    fn address(&self) -> &Address;

    /// Whether bytecode exists at `address()`
    async fn has_code(&self) -> Result<bool>;

    async fn bounty_count(&self) -> Result<u64>;

    async fn active_bounty_ids(&self) -> Result<Vec<BountyId>>;

    /// Parallel arrays: ids, creators, amounts, metadata CIDs
    async fn active_bounties(&self) -> Result<ActiveBountyArrays>;

    async fn bounty(&self, bounty_id: BountyId) -> Result<RawBounty>;

    async fn is_active(&self, bounty_id: BountyId) -> Result<bool>;

    async fn submission_count(&self, bounty_id: BountyId) -> Result<u64>;

    /// Description CID of `hunter`'s submission, empty string if none
    async fn submission(&self, bounty_id: BountyId, hunter: &Address) -> Result<String>;

    /// Aggregate read; not available on every deployment
    async fn all_submissions(&self, bounty_id: BountyId) -> Result<Vec<Submission>>;

    async fn bounty_submitters(&self, bounty_id: BountyId) -> Result<Vec<Address>>;

    async fn create_bounty(&self, from: &Address, amount: u128, metadata_cid: &str) -> Result<TxHash>;

    async fn submit_to_bounty(
        &self,
        from: &Address,
        bounty_id: BountyId,
        description_cid: &str,
    ) -> Result<TxHash>;

    async fn pay_hunter(&self, from: &Address, bounty_id: BountyId, hunter: &Address) -> Result<TxHash>;

    async fn cancel_bounty(&self, from: &Address, bounty_id: BountyId) -> Result<TxHash>;
}

/// Standard fungible-token read/write pair. Amounts are smallest units.
#[async_trait]
pub trait RewardToken: Send + Sync {
    fn address(&self) -> &Address;

    async fn balance_of(&self, owner: &Address) -> Result<u128>;

    async fn allowance(&self, owner: &Address, spender: &Address) -> Result<u128>;

    async fn approve(&self, from: &Address, spender: &Address, amount: u128) -> Result<TxHash>;
}

#[async_trait]
pub trait ReceiptSource: Send + Sync {
    /// Wait until `tx_hash` is mined. An `Err` means the receipt could not be
    /// fetched, which says nothing about whether the transaction succeeded.
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt>;
}
