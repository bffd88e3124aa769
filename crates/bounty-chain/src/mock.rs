//! In-memory escrow contract and reward token
//!
//! Follows the deployed contract's rules (allowance-funded escrow, one
//! submission per hunter, creator-only settlement) so workflows can be driven
//! end to end without a node. Every call is appended to a log, and reads,
//! receipts and writes can be made to fail on demand.
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bounty_core::{
    ActiveBountyArrays, Address, BountyContract, BountyError, BountyId, BountyStatus, RawBounty,
    Receipt, ReceiptSource, ReceiptStatus, Result, RewardToken, Submission, TxHash,
};
use tokio::sync::Mutex;
use tracing::debug;

pub const MOCK_CONTRACT_ADDRESS: &str = "0xb0b0000000000000000000000000000000000001";
pub const MOCK_TOKEN_ADDRESS: &str = "0x70ce000000000000000000000000000000000002";

#[derive(Default)]
struct MockState {
    next_id: BountyId,
    bounties: BTreeMap<BountyId, RawBounty>,
    submissions: HashMap<BountyId, Vec<Submission>>,
    balances: HashMap<String, u128>,
    allowances: HashMap<(String, String), u128>,
    receipts: HashMap<String, Receipt>,
    tx_methods: HashMap<String, String>,
    tx_counter: u64,
    block: u64,
    calls: Vec<String>,
    failing_reads: HashSet<String>,
    failing_lookups: HashSet<String>,
    reverting: HashSet<String>,
    failing_receipts: HashSet<String>,
    delays: HashMap<String, Duration>,
    truncate_amounts: bool,
    no_code: bool,
}

impl MockState {
    fn submissions_of(&self, bounty_id: BountyId) -> &[Submission] {
        self.submissions
            .get(&bounty_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn balance(&self, owner: &Address) -> u128 {
        self.balances.get(&key(owner)).copied().unwrap_or(0)
    }

    fn credit(&mut self, owner: &Address, amount: u128) {
        *self.balances.entry(key(owner)).or_insert(0) += amount;
    }

    fn mine(&mut self, method: &str, status: ReceiptStatus) -> TxHash {
        self.tx_counter += 1;
        self.block += 1;
        let tx_hash = TxHash(format!("0x{:064x}", self.tx_counter));
        self.receipts.insert(
            tx_hash.0.clone(),
            Receipt {
                tx_hash: tx_hash.clone(),
                status,
                block_number: self.block,
            },
        );
        self.tx_methods.insert(tx_hash.0.clone(), method.to_string());
        tx_hash
    }
}

fn key(address: &Address) -> String {
    address.as_str().to_ascii_lowercase()
}

fn rejected(reason: &str) -> BountyError {
    BountyError::Transaction(format!("execution reverted: {}", reason))
}

pub struct MockChain {
    contract_address: Address,
    token_address: Address,
    state: Mutex<MockState>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            contract_address: Address::new(MOCK_CONTRACT_ADDRESS),
            token_address: Address::new(MOCK_TOKEN_ADDRESS),
            state: Mutex::new(MockState::default()),
        })
    }

    pub fn contract_address(&self) -> &Address {
        &self.contract_address
    }

    pub fn token_address(&self) -> &Address {
        &self.token_address
    }

    /// Append an entry to the call log; lets test doubles for other
    /// boundaries interleave with chain calls.
    pub async fn record(&self, entry: impl Into<String>) {
        self.state.lock().await.calls.push(entry.into());
    }

    pub async fn calls(&self) -> Vec<String> {
        self.state.lock().await.calls.clone()
    }

    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    pub async fn fund(&self, owner: &Address, amount: u128) {
        self.state.lock().await.credit(owner, amount);
    }

    pub async fn balance(&self, owner: &Address) -> u128 {
        self.state.lock().await.balance(owner)
    }

    /// Insert an active bounty without touching balances.
    pub async fn seed_bounty(&self, creator: &Address, amount: u128, metadata_cid: &str) -> BountyId {
        let mut state = self.state.lock().await;
        let id = state.next_id;
        state.next_id += 1;
        state.bounties.insert(
            id,
            RawBounty {
                id,
                creator: creator.clone(),
                amount,
                status: BountyStatus::Active,
                metadata_cid: metadata_cid.to_string(),
            },
        );
        id
    }

    pub async fn seed_submission(&self, bounty_id: BountyId, hunter: &Address, description_cid: &str) {
        self.state
            .lock()
            .await
            .submissions
            .entry(bounty_id)
            .or_default()
            .push(Submission {
                hunter: hunter.clone(),
                description_cid: description_cid.to_string(),
            });
    }

    pub async fn set_status(&self, bounty_id: BountyId, status: BountyStatus) {
        if let Some(bounty) = self.state.lock().await.bounties.get_mut(&bounty_id) {
            bounty.status = status;
        }
    }

    /// Make every read of `method` fail with a network error.
    pub async fn fail_reads(&self, method: &str) {
        self.state.lock().await.failing_reads.insert(method.to_string());
    }

    pub async fn heal_reads(&self) {
        self.state.lock().await.failing_reads.clear();
    }

    /// Make `submission(_, hunter)` fail for one hunter.
    pub async fn fail_submission_lookup(&self, hunter: &Address) {
        self.state.lock().await.failing_lookups.insert(key(hunter));
    }

    /// Writes of `method` are mined with a reverted receipt and no state change.
    pub async fn revert_writes(&self, method: &str) {
        self.state.lock().await.reverting.insert(method.to_string());
    }

    /// Receipt lookups for transactions sent by `method` fail in transport.
    pub async fn fail_receipts(&self, method: &str) {
        self.state.lock().await.failing_receipts.insert(method.to_string());
    }

    pub async fn heal_receipts(&self) {
        self.state.lock().await.failing_receipts.clear();
    }

    /// Drop the last amount from `active_bounties`, as a half-settled read would.
    pub async fn set_truncate_amounts(&self, truncate: bool) {
        self.state.lock().await.truncate_amounts = truncate;
    }

    pub async fn set_has_code(&self, has_code: bool) {
        self.state.lock().await.no_code = !has_code;
    }

    /// Delay replies to `method`. The reply reflects state at the time the
    /// call was served.
    pub async fn set_delay(&self, method: &str, delay: Duration) {
        self.state.lock().await.delays.insert(method.to_string(), delay);
    }

    pub async fn clear_delays(&self) {
        self.state.lock().await.delays.clear();
    }

    async fn read<T>(&self, method: &str, f: impl FnOnce(&MockState) -> Result<T>) -> Result<T> {
        let (value, delay) = {
            let mut state = self.state.lock().await;
            state.calls.push(method.to_string());
            if state.failing_reads.contains(method) {
                return Err(BountyError::Network(format!("{} unavailable", method)));
            }
            (f(&*state), state.delays.get(method).copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        value
    }

    /// Log a write and hand back the locked state.
    async fn write(&self, method: &str) -> tokio::sync::MutexGuard<'_, MockState> {
        let mut state = self.state.lock().await;
        state.calls.push(method.to_string());
        state
    }
}

#[async_trait]
impl BountyContract for MockChain {
    fn address(&self) -> &Address {
        &self.contract_address
    }

    async fn has_code(&self) -> Result<bool> {
        self.read("has_code", |s| Ok(!s.no_code)).await
    }

    async fn bounty_count(&self) -> Result<u64> {
        self.read("bounty_count", |s| Ok(s.next_id)).await
    }

    async fn active_bounty_ids(&self) -> Result<Vec<BountyId>> {
        self.read("active_bounty_ids", |s| {
            Ok(s.bounties
                .values()
                .filter(|b| b.status == BountyStatus::Active)
                .map(|b| b.id)
                .collect())
        })
        .await
    }

    async fn active_bounties(&self) -> Result<ActiveBountyArrays> {
        self.read("active_bounties", |s| {
            let mut arrays = ActiveBountyArrays::default();
            for bounty in s.bounties.values().filter(|b| b.status == BountyStatus::Active) {
                arrays.ids.push(bounty.id);
                arrays.creators.push(bounty.creator.clone());
                arrays.amounts.push(bounty.amount);
                arrays.metadata_cids.push(bounty.metadata_cid.clone());
            }
            if s.truncate_amounts {
                arrays.amounts.pop();
            }
            Ok(arrays)
        })
        .await
    }

    async fn bounty(&self, bounty_id: BountyId) -> Result<RawBounty> {
        self.read("bounty", |s| {
            s.bounties
                .get(&bounty_id)
                .cloned()
                .ok_or_else(|| BountyError::NotFound(format!("bounty #{}", bounty_id)))
        })
        .await
    }

    async fn is_active(&self, bounty_id: BountyId) -> Result<bool> {
        self.read("is_active", |s| {
            Ok(s.bounties
                .get(&bounty_id)
                .map(|b| b.status == BountyStatus::Active)
                .unwrap_or(false))
        })
        .await
    }

    async fn submission_count(&self, bounty_id: BountyId) -> Result<u64> {
        self.read("submission_count", |s| Ok(s.submissions_of(bounty_id).len() as u64))
            .await
    }

    async fn submission(&self, bounty_id: BountyId, hunter: &Address) -> Result<String> {
        self.read("submission", |s| {
            if s.failing_lookups.contains(&key(hunter)) {
                return Err(BountyError::Network(format!("submission lookup for {} failed", hunter)));
            }
            Ok(s.submissions_of(bounty_id)
                .iter()
                .find(|sub| sub.hunter.same_as(hunter))
                .map(|sub| sub.description_cid.clone())
                .unwrap_or_default())
        })
        .await
    }

    async fn all_submissions(&self, bounty_id: BountyId) -> Result<Vec<Submission>> {
        self.read("all_submissions", |s| Ok(s.submissions_of(bounty_id).to_vec()))
            .await
    }

    async fn bounty_submitters(&self, bounty_id: BountyId) -> Result<Vec<Address>> {
        self.read("bounty_submitters", |s| {
            Ok(s.submissions_of(bounty_id)
                .iter()
                .map(|sub| sub.hunter.clone())
                .collect())
        })
        .await
    }

    async fn create_bounty(&self, from: &Address, amount: u128, metadata_cid: &str) -> Result<TxHash> {
        let mut state = self.write("create_bounty").await;
        if state.reverting.contains("create_bounty") {
            return Ok(state.mine("create_bounty", ReceiptStatus::Reverted));
        }
        if amount == 0 {
            return Err(rejected("amount must be positive"));
        }
        let allowance_key = (key(from), key(&self.contract_address));
        let allowance = state.allowances.get(&allowance_key).copied().unwrap_or(0);
        if allowance < amount {
            return Err(rejected("insufficient allowance"));
        }
        if state.balance(from) < amount {
            return Err(rejected("transfer amount exceeds balance"));
        }

        let remaining = state.balance(from) - amount;
        state.allowances.insert(allowance_key, allowance - amount);
        state.balances.insert(key(from), remaining);
        let id = state.next_id;
        state.next_id += 1;
        state.bounties.insert(
            id,
            RawBounty {
                id,
                creator: from.clone(),
                amount,
                status: BountyStatus::Active,
                metadata_cid: metadata_cid.to_string(),
            },
        );
        debug!(bounty_id = id, amount, "mock bounty created");
        Ok(state.mine("create_bounty", ReceiptStatus::Success))
    }

    async fn submit_to_bounty(
        &self,
        from: &Address,
        bounty_id: BountyId,
        description_cid: &str,
    ) -> Result<TxHash> {
        let mut state = self.write("submit_to_bounty").await;
        if state.reverting.contains("submit_to_bounty") {
            return Ok(state.mine("submit_to_bounty", ReceiptStatus::Reverted));
        }
        let bounty = state
            .bounties
            .get(&bounty_id)
            .ok_or_else(|| rejected("bounty does not exist"))?;
        if bounty.status != BountyStatus::Active {
            return Err(rejected("bounty is not active"));
        }
        if bounty.creator.same_as(from) {
            return Err(rejected("creator cannot submit"));
        }
        if description_cid.is_empty() {
            return Err(rejected("empty submission"));
        }
        if state
            .submissions_of(bounty_id)
            .iter()
            .any(|s| s.hunter.same_as(from) && !s.description_cid.is_empty())
        {
            return Err(rejected("already submitted"));
        }

        state.submissions.entry(bounty_id).or_default().push(Submission {
            hunter: from.clone(),
            description_cid: description_cid.to_string(),
        });
        Ok(state.mine("submit_to_bounty", ReceiptStatus::Success))
    }

    async fn pay_hunter(&self, from: &Address, bounty_id: BountyId, hunter: &Address) -> Result<TxHash> {
        let mut state = self.write("pay_hunter").await;
        if state.reverting.contains("pay_hunter") {
            return Ok(state.mine("pay_hunter", ReceiptStatus::Reverted));
        }
        let bounty = state
            .bounties
            .get(&bounty_id)
            .cloned()
            .ok_or_else(|| rejected("bounty does not exist"))?;
        if !bounty.creator.same_as(from) {
            return Err(rejected("only creator"));
        }
        if bounty.status != BountyStatus::Active {
            return Err(rejected("bounty is not active"));
        }
        if !state.submissions_of(bounty_id).iter().any(|s| s.hunter.same_as(hunter)) {
            return Err(rejected("hunter has not submitted"));
        }

        state.credit(hunter, bounty.amount);
        if let Some(b) = state.bounties.get_mut(&bounty_id) {
            b.status = BountyStatus::Completed;
        }
        Ok(state.mine("pay_hunter", ReceiptStatus::Success))
    }

    async fn cancel_bounty(&self, from: &Address, bounty_id: BountyId) -> Result<TxHash> {
        let mut state = self.write("cancel_bounty").await;
        if state.reverting.contains("cancel_bounty") {
            return Ok(state.mine("cancel_bounty", ReceiptStatus::Reverted));
        }
        let bounty = state
            .bounties
            .get(&bounty_id)
            .cloned()
            .ok_or_else(|| rejected("bounty does not exist"))?;
        if !bounty.creator.same_as(from) {
            return Err(rejected("only creator"));
        }
        if bounty.status != BountyStatus::Active {
            return Err(rejected("bounty is not active"));
        }

        state.credit(from, bounty.amount);
        if let Some(b) = state.bounties.get_mut(&bounty_id) {
            b.status = BountyStatus::Cancelled;
        }
        Ok(state.mine("cancel_bounty", ReceiptStatus::Success))
    }
}

#[async_trait]
impl RewardToken for MockChain {
    fn address(&self) -> &Address {
        &self.token_address
    }

    async fn balance_of(&self, owner: &Address) -> Result<u128> {
        self.read("balance_of", |s| Ok(s.balance(owner))).await
    }

    async fn allowance(&self, owner: &Address, spender: &Address) -> Result<u128> {
        self.read("allowance", |s| {
            Ok(s.allowances
                .get(&(key(owner), key(spender)))
                .copied()
                .unwrap_or(0))
        })
        .await
    }

    async fn approve(&self, from: &Address, spender: &Address, amount: u128) -> Result<TxHash> {
        let mut state = self.write("approve").await;
        if state.reverting.contains("approve") {
            return Ok(state.mine("approve", ReceiptStatus::Reverted));
        }
        state.allowances.insert((key(from), key(spender)), amount);
        Ok(state.mine("approve", ReceiptStatus::Success))
    }
}

#[async_trait]
impl ReceiptSource for MockChain {
    async fn wait_for_receipt(&self, tx_hash: &TxHash) -> Result<Receipt> {
        let (receipt, delay) = {
            let mut state = self.state.lock().await;
            let method = state
                .tx_methods
                .get(&tx_hash.0)
                .cloned()
                .unwrap_or_else(|| "unknown".to_string());
            state.calls.push(format!("wait_for_receipt:{}", method));

            let receipt = if state.failing_receipts.contains(&method) {
                Err(BountyError::Network("receipt request timed out".to_string()))
            } else {
                state
                    .receipts
                    .get(&tx_hash.0)
                    .cloned()
                    .ok_or_else(|| BountyError::NotFound(format!("receipt {}", tx_hash)))
            };
            (receipt, state.delays.get("wait_for_receipt").copied())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        receipt
    }
}
