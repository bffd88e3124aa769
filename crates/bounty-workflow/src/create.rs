//! Create bounty: upload the document, approve if needed, then create
use std::sync::Arc;

use bounty_core::{parse_units, Address, BountyDocument, BountyError, BountyForm, Result, REWARD_DECIMALS};
use bounty_policy::{check_balance, require_connected, validate_bounty_form};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::context::WriteContext;
use crate::state::{Attempt, StepRecord, WorkflowHandle, WorkflowState, WriteOutcome};

/// Uploaded and checked, waiting on the approve/create half.
#[derive(Debug, Clone)]
struct PendingCreate {
    creator: Address,
    amount: u128,
    cid: String,
}

pub struct CreateBountyWorkflow {
    ctx: Arc<WriteContext>,
    handle: WorkflowHandle,
    pending: Mutex<Option<PendingCreate>>,
}

impl CreateBountyWorkflow {
    pub fn new(ctx: Arc<WriteContext>) -> Self {
        Self {
            ctx,
            handle: WorkflowHandle::new(),
            pending: Mutex::new(None),
        }
    }

    pub fn handle(&self) -> &WorkflowHandle {
        &self.handle
    }

    pub async fn state(&self) -> WorkflowState {
        self.handle.state().await
    }

    pub async fn steps(&self) -> Vec<StepRecord> {
        self.handle.steps().await
    }

    /// Validate, check balance, upload, then run the on-chain half.
    pub async fn run(
        &self,
        creator: Option<&Address>,
        form: &BountyForm,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let attempt = self.handle.begin().await?;
        self.pending.lock().await.take();

        let result = self.execute(&attempt, creator, form, now).await;
        self.settle(&attempt, result).await
    }

    /// Continue after an approval whose receipt could not be fetched. The
    /// allowance is read again, so a landed approval is not repeated.
    pub async fn resume(&self) -> Result<WriteOutcome> {
        let mut slot = self.pending.lock().await;
        let resumable = matches!(self.handle.state().await, WorkflowState::NeedsAttention { .. });
        let pending = match slot.take() {
            Some(pending) if resumable => pending,
            other => {
                *slot = other;
                return Err(BountyError::Validation("Nothing to resume".to_string()));
            }
        };

        let attempt = match self.handle.begin().await {
            Ok(attempt) => attempt,
            Err(err) => {
                *slot = Some(pending);
                return Err(err);
            }
        };
        drop(slot);

        info!(run = %attempt.id, cid = %pending.cid, "resuming bounty creation");
        let result = self.spend(&attempt, pending).await;
        self.settle(&attempt, result).await
    }

    /// Abandon the current attempt; anything it still returns is ignored.
    pub async fn reset(&self) -> WorkflowState {
        self.pending.lock().await.take();
        self.handle.reset().await
    }

    async fn execute(
        &self,
        attempt: &Attempt,
        creator: Option<&Address>,
        form: &BountyForm,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let creator = require_connected(creator)?.clone();
        validate_bounty_form(form, now).into_result()?;
        let amount = parse_units(&form.reward, REWARD_DECIMALS)?;

        let balance = self.ctx.token.balance_of(&creator).await?;
        check_balance(balance, amount)?;

        self.handle.advance(attempt, WorkflowState::Uploading).await?;
        let document = BountyDocument::from_form(form, Some(&creator), &self.ctx.platform, &self.ctx.network, now);
        let cid = self.ctx.uploader.upload_bounty(&document).await?;
        info!(run = %attempt.id, cid = %cid, "bounty document uploaded");

        self.spend(attempt, PendingCreate { creator, amount, cid }).await
    }

    async fn spend(&self, attempt: &Attempt, pending: PendingCreate) -> Result<WriteOutcome> {
        let ctx = &self.ctx;
        let spender = ctx.contract.address().clone();

        self.handle.advance(attempt, WorkflowState::Checking).await?;
        let allowance = ctx.token.allowance(&pending.creator, &spender).await?;

        if allowance < pending.amount {
            self.handle.advance(attempt, WorkflowState::Approving).await?;
            let approval = ctx.token.approve(&pending.creator, &spender, pending.amount).await?;
            info!(run = %attempt.id, tx = %approval, "approval sent");

            match ctx.confirm(&approval).await {
                Ok(_) => {}
                Err(BountyError::AmbiguousConfirmation { tx_hash, reason }) => {
                    let warning = format!(
                        "Approval {} may have succeeded but its receipt could not be fetched ({}). \
                         Check your wallet, then continue.",
                        tx_hash, reason
                    );
                    let cid = pending.cid.clone();
                    *self.pending.lock().await = Some(pending);
                    self.handle
                        .advance(
                            attempt,
                            WorkflowState::NeedsAttention {
                                warning: warning.clone(),
                                cid: cid.clone(),
                            },
                        )
                        .await?;
                    warn!(run = %attempt.id, tx = %tx_hash, "approval outcome unknown");
                    return Ok(WriteOutcome::NeedsAttention { warning, cid });
                }
                Err(err) => return Err(err),
            }
        }

        self.handle.advance(attempt, WorkflowState::Writing).await?;
        let tx_hash = ctx
            .contract
            .create_bounty(&pending.creator, pending.amount, &pending.cid)
            .await?;
        info!(run = %attempt.id, tx = %tx_hash, "create transaction sent");

        self.handle
            .advance(
                attempt,
                WorkflowState::Confirming {
                    tx_hash: tx_hash.to_string(),
                },
            )
            .await?;
        ctx.confirm(&tx_hash).await?;
        ctx.notify_list().await;

        self.handle
            .advance(
                attempt,
                WorkflowState::Completed {
                    cid: Some(pending.cid.clone()),
                    tx_hash: tx_hash.to_string(),
                },
            )
            .await?;
        Ok(WriteOutcome::Completed {
            tx_hash,
            cid: Some(pending.cid),
        })
    }

    async fn settle(&self, attempt: &Attempt, result: Result<WriteOutcome>) -> Result<WriteOutcome> {
        if let Err(err) = &result {
            self.handle.fail(attempt, err).await;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounty_chain::MockChain;
    use bounty_core::ErrorKind;
    use bounty_metadata::{MemoryBlobStore, MetadataUploader};
    use chrono::Duration;

    fn addr(n: u8) -> Address {
        Address::new(format!("0x{:040x}", n))
    }

    fn form(reward: &str) -> BountyForm {
        BountyForm {
            title: "Fix the bridge".to_string(),
            description: "Details".to_string(),
            reward: reward.to_string(),
            deadline: (Utc::now() + Duration::days(7)).to_rfc3339(),
            tags: vec!["rust".to_string()],
        }
    }

    fn workflow(chain: &Arc<MockChain>, store: Arc<MemoryBlobStore>) -> CreateBountyWorkflow {
        let ctx = WriteContext::new(
            chain.clone(),
            chain.clone(),
            chain.clone(),
            MetadataUploader::new(store),
        );
        CreateBountyWorkflow::new(Arc::new(ctx))
    }

    #[tokio::test]
    async fn test_insufficient_balance_blocks_before_upload() {
        let chain = MockChain::new();
        let store = Arc::new(MemoryBlobStore::new());
        chain.fund(&addr(1), 1_000_000).await;
        let wf = workflow(&chain, store.clone());

        let err = wf.run(Some(&addr(1)), &form("2"), Utc::now()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InsufficientBalance);
        assert_eq!(store.put_count(), 0);
        assert!(matches!(
            wf.state().await,
            WorkflowState::Failed {
                kind: ErrorKind::InsufficientBalance,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_invalid_form_touches_nothing() {
        let chain = MockChain::new();
        let store = Arc::new(MemoryBlobStore::new());
        let wf = workflow(&chain, store.clone());

        let err = wf.run(Some(&addr(1)), &form("0"), Utc::now()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(chain.calls().await.is_empty());
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_not_connected() {
        let chain = MockChain::new();
        let wf = workflow(&chain, Arc::new(MemoryBlobStore::new()));

        let err = wf.run(None, &form("1"), Utc::now()).await.unwrap_err();
        assert_eq!(err, BountyError::NotConnected);
    }

    #[tokio::test]
    async fn test_existing_allowance_skips_approval() {
        let chain = MockChain::new();
        let me = addr(1);
        chain.fund(&me, 5_000_000).await;
        let contract = chain.contract_address().clone();
        bounty_core::RewardToken::approve(chain.as_ref(), &me, &contract, 5_000_000)
            .await
            .unwrap();
        chain.clear_calls().await;

        let wf = workflow(&chain, Arc::new(MemoryBlobStore::new()));
        let outcome = wf.run(Some(&me), &form("1.5"), Utc::now()).await.unwrap();

        assert!(outcome.tx_hash().is_some());
        let calls = chain.calls().await;
        assert!(!calls.iter().any(|c| c == "approve"));
        assert_eq!(chain.balance(&me).await, 3_500_000);
    }

    #[tokio::test]
    async fn test_reward_checked_and_spent_at_one_scale() {
        let chain = MockChain::new();
        let me = addr(1);
        chain.fund(&me, 1).await;
        let wf = workflow(&chain, Arc::new(MemoryBlobStore::new()));

        let err = wf.run(Some(&me), &form("0.0000001"), Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(chain.calls().await.is_empty());

        wf.run(Some(&me), &form("0.000001"), Utc::now()).await.unwrap();
        assert_eq!(chain.balance(&me).await, 0);
    }

    #[tokio::test]
    async fn test_upload_failure_never_reaches_chain_write() {
        let chain = MockChain::new();
        let store = Arc::new(MemoryBlobStore::new());
        store.set_fail_puts(true);
        chain.fund(&addr(1), 5_000_000).await;
        let wf = workflow(&chain, store);

        let err = wf.run(Some(&addr(1)), &form("1"), Utc::now()).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::UploadFailed);
        let calls = chain.calls().await;
        assert!(!calls.iter().any(|c| c == "allowance" || c == "create_bounty"));
    }

    #[tokio::test]
    async fn test_resume_without_pending_is_rejected() {
        let chain = MockChain::new();
        let wf = workflow(&chain, Arc::new(MemoryBlobStore::new()));

        let err = wf.resume().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(wf.state().await, WorkflowState::Idle);
    }
}
