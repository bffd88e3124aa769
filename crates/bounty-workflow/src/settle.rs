//! Single-phase creator writes: pay a hunter, cancel a bounty
use std::sync::Arc;

use bounty_core::{Address, BountyId, EnhancedBounty, Result, TxHash};
use bounty_policy::{check_cancel, require_connected};
use tracing::info;

use crate::context::WriteContext;
use crate::state::{Attempt, WorkflowHandle, WorkflowState, WriteOutcome};

pub struct SettlementWorkflow {
    ctx: Arc<WriteContext>,
    handle: WorkflowHandle,
}

impl SettlementWorkflow {
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

    pub async fn reset(&self) -> WorkflowState {
        self.handle.reset().await
    }

    pub async fn pay_hunter(
        &self,
        creator: Option<&Address>,
        bounty_id: BountyId,
        hunter: &Address,
    ) -> Result<WriteOutcome> {
        let attempt = self.handle.begin().await?;
        let result = async {
            let creator = require_connected(creator)?;
            self.handle.advance(&attempt, WorkflowState::Writing).await?;
            let tx_hash = self.ctx.contract.pay_hunter(creator, bounty_id, hunter).await?;
            info!(run = %attempt.id, bounty_id, hunter = %hunter, tx = %tx_hash, "payout sent");
            self.confirm(&attempt, tx_hash).await
        }
        .await;
        self.finish(&attempt, result).await
    }

    /// `owned` is the bounty as listed in the viewer's own bounties.
    pub async fn cancel(
        &self,
        viewer: Option<&Address>,
        bounty_id: BountyId,
        owned: Option<&EnhancedBounty>,
    ) -> Result<WriteOutcome> {
        let attempt = self.handle.begin().await?;
        let result = async {
            check_cancel(bounty_id, viewer, owned)?;
            let creator = require_connected(viewer)?;
            self.handle.advance(&attempt, WorkflowState::Writing).await?;
            let tx_hash = self.ctx.contract.cancel_bounty(creator, bounty_id).await?;
            info!(run = %attempt.id, bounty_id, tx = %tx_hash, "cancel sent");
            self.confirm(&attempt, tx_hash).await
        }
        .await;
        self.finish(&attempt, result).await
    }

    /// A settled bounty leaves the active set, so the whole list is stale.
    async fn confirm(&self, attempt: &Attempt, tx_hash: TxHash) -> Result<WriteOutcome> {
        self.handle
            .advance(
                attempt,
                WorkflowState::Confirming {
                    tx_hash: tx_hash.to_string(),
                },
            )
            .await?;
        self.ctx.confirm(&tx_hash).await?;
        self.ctx.notify_list().await;

        self.handle
            .advance(
                attempt,
                WorkflowState::Completed {
                    cid: None,
                    tx_hash: tx_hash.to_string(),
                },
            )
            .await?;
        Ok(WriteOutcome::Completed { tx_hash, cid: None })
    }

    async fn finish(&self, attempt: &Attempt, result: Result<WriteOutcome>) -> Result<WriteOutcome> {
        if let Err(err) = &result {
            self.handle.fail(attempt, err).await;
        }
        result
    }
}
