//! Submit to bounty: eligibility first, then upload, then the on-chain write
use std::sync::Arc;

use bounty_core::{Address, BountyError, BountyId, Result, SubmissionDocument, SubmissionForm};
use bounty_policy::{
    check_contract_deployed, check_submit_eligibility, require_connected, validate_submission_form, SubmitFacts,
};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::context::WriteContext;
use crate::state::{Attempt, StepRecord, WorkflowHandle, WorkflowState, WriteOutcome};

pub struct SubmitWorkflow {
    ctx: Arc<WriteContext>,
    handle: WorkflowHandle,
}

impl SubmitWorkflow {
    pub fn new(ctx: Arc<WriteContext>) -> Self {
        Self {
            ctx,
            handle: WorkflowHandle::new(),
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

    pub async fn reset(&self) -> WorkflowState {
        self.handle.reset().await
    }

    /// Every rejection before `Uploading` leaves the store and the chain
    /// untouched.
    pub async fn run(
        &self,
        hunter: Option<&Address>,
        form: &SubmissionForm,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let attempt = self.handle.begin().await?;
        let result = self.execute(&attempt, hunter, form, now).await;
        if let Err(err) = &result {
            self.handle.fail(&attempt, err).await;
        }
        result
    }

    async fn execute(
        &self,
        attempt: &Attempt,
        hunter: Option<&Address>,
        form: &SubmissionForm,
        now: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let ctx = &self.ctx;
        let hunter = require_connected(hunter)?.clone();
        validate_submission_form(form).into_result()?;

        check_contract_deployed(ctx.contract.has_code().await?, ctx.contract.address())?;
        let facts = self.facts(form.bounty_id, &hunter).await?;
        check_submit_eligibility(form.bounty_id, &hunter, &facts)?;

        self.handle.advance(attempt, WorkflowState::Uploading).await?;
        let document = SubmissionDocument::new(&form.title, &form.description, Some(&hunter), &ctx.platform, now);
        let cid = ctx.uploader.upload_submission(&document).await?;
        info!(run = %attempt.id, bounty_id = form.bounty_id, cid = %cid, "submission uploaded");

        self.handle.advance(attempt, WorkflowState::Writing).await?;
        let tx_hash = ctx.contract.submit_to_bounty(&hunter, form.bounty_id, &cid).await?;
        info!(run = %attempt.id, tx = %tx_hash, "submit transaction sent");

        self.handle
            .advance(
                attempt,
                WorkflowState::Confirming {
                    tx_hash: tx_hash.to_string(),
                },
            )
            .await?;
        ctx.confirm(&tx_hash).await?;
        ctx.notify_bounty(form.bounty_id).await;

        self.handle
            .advance(
                attempt,
                WorkflowState::Completed {
                    cid: Some(cid.clone()),
                    tx_hash: tx_hash.to_string(),
                },
            )
            .await?;
        Ok(WriteOutcome::Completed {
            tx_hash,
            cid: Some(cid),
        })
    }

    /// An unreadable activity flag aborts; an unreadable creator or
    /// submission record only skips that rule.
    async fn facts(&self, bounty_id: BountyId, hunter: &Address) -> Result<SubmitFacts> {
        let contract = &self.ctx.contract;
        let active = contract.is_active(bounty_id).await.map_err(|e| {
            debug!(bounty_id, error = %e, "activity check failed");
            BountyError::Network(format!("Failed to check if bounty #{} is active", bounty_id))
        })?;

        let (record, existing) = tokio::join!(contract.bounty(bounty_id), contract.submission(bounty_id, hunter));
        Ok(SubmitFacts {
            active,
            creator: record.ok().map(|b| b.creator),
            already_submitted: existing.map(|cid| !cid.is_empty()).unwrap_or(false),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bounty_chain::MockChain;
    use bounty_core::{BountyStatus, ErrorKind};
    use bounty_metadata::{MemoryBlobStore, MetadataUploader};

    fn addr(n: u8) -> Address {
        Address::new(format!("0x{:040x}", n))
    }

    fn form(bounty_id: BountyId) -> SubmissionForm {
        SubmissionForm {
            bounty_id,
            title: "  My fix  ".to_string(),
            description: "Patched the overflow".to_string(),
        }
    }

    fn workflow(chain: &Arc<MockChain>, store: Arc<MemoryBlobStore>) -> SubmitWorkflow {
        let ctx = WriteContext::new(
            chain.clone(),
            chain.clone(),
            chain.clone(),
            MetadataUploader::new(store),
        );
        SubmitWorkflow::new(Arc::new(ctx))
    }

    #[tokio::test]
    async fn test_submit_happy_path() {
        let chain = MockChain::new();
        let store = Arc::new(MemoryBlobStore::new());
        let id = chain.seed_bounty(&addr(1), 1_000_000, "meta").await;
        let wf = workflow(&chain, store.clone());

        let outcome = wf.run(Some(&addr(2)), &form(id), Utc::now()).await.unwrap();

        let WriteOutcome::Completed { cid: Some(cid), .. } = outcome else {
            panic!("expected completion");
        };
        let uploader = MetadataUploader::new(store);
        let doc = uploader.retrieve_submission(&cid).await.unwrap();
        assert_eq!(doc.title, "My fix");
        assert_eq!(doc.submitter_address, addr(2));
        assert!(matches!(wf.state().await, WorkflowState::Completed { .. }));
    }

    #[tokio::test]
    async fn test_creator_cannot_submit() {
        let chain = MockChain::new();
        let store = Arc::new(MemoryBlobStore::new());
        let id = chain.seed_bounty(&addr(1), 1_000_000, "meta").await;
        let wf = workflow(&chain, store.clone());

        let err = wf.run(Some(&addr(1)), &form(id), Utc::now()).await.unwrap_err();

        assert_eq!(err, BountyError::SelfSubmission);
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_inactive_bounty_rejected() {
        let chain = MockChain::new();
        let store = Arc::new(MemoryBlobStore::new());
        let id = chain.seed_bounty(&addr(1), 1_000_000, "meta").await;
        chain.set_status(id, BountyStatus::Cancelled).await;
        let wf = workflow(&chain, store.clone());

        let err = wf.run(Some(&addr(2)), &form(id), Utc::now()).await.unwrap_err();

        assert_eq!(err, BountyError::InactiveBounty(id));
        assert_eq!(store.put_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_contract_code() {
        let chain = MockChain::new();
        chain.set_has_code(false).await;
        let wf = workflow(&chain, Arc::new(MemoryBlobStore::new()));

        let err = wf.run(Some(&addr(2)), &form(0), Utc::now()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ContractNotFound);
        assert!(!chain.calls().await.iter().any(|c| c == "is_active"));
    }

    #[tokio::test]
    async fn test_activity_read_failure_is_network_error() {
        let chain = MockChain::new();
        let id = chain.seed_bounty(&addr(1), 1_000_000, "meta").await;
        chain.fail_reads("is_active").await;
        let wf = workflow(&chain, Arc::new(MemoryBlobStore::new()));

        let err = wf.run(Some(&addr(2)), &form(id), Utc::now()).await.unwrap_err();
        assert_eq!(
            err,
            BountyError::Network(format!("Failed to check if bounty #{} is active", id))
        );
    }

    #[tokio::test]
    async fn test_lookup_failure_does_not_block() {
        let chain = MockChain::new();
        let id = chain.seed_bounty(&addr(1), 1_000_000, "meta").await;
        chain.fail_submission_lookup(&addr(2)).await;
        let wf = workflow(&chain, Arc::new(MemoryBlobStore::new()));

        assert!(wf.run(Some(&addr(2)), &form(id), Utc::now()).await.is_ok());
    }
}
