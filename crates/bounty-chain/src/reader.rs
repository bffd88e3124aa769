//! Chain Reader: side-effect-free queries over the bounty contract
//!
//! Read failures on per-bounty lookups degrade to defaults (0 submissions, no
//! submission) so one bad read never blocks the board.
use std::sync::Arc;

use bounty_core::{
    Address, BountyContract, BountyId, BountyStatus, RawBounty, Result, Submission,
};
use tracing::{debug, warn};

#[derive(Clone)]
pub struct ChainReader {
    contract: Arc<dyn BountyContract>,
}

impl ChainReader {
    pub fn new(contract: Arc<dyn BountyContract>) -> Self {
        Self { contract }
    }

    pub fn contract(&self) -> &Arc<dyn BountyContract> {
        &self.contract
    }

    pub async fn bounty_count(&self) -> Result<u64> {
        self.contract.bounty_count().await
    }

    pub async fn active_bounty_ids(&self) -> Result<Vec<BountyId>> {
        self.contract.active_bounty_ids().await
    }

    /// Zip the contract's four parallel arrays into records. Arrays of
    /// unequal length mean the read is not settled yet and yield no bounties.
    pub async fn all_active_bounties(&self) -> Result<Vec<RawBounty>> {
        let arrays = self.contract.active_bounties().await?;

        if !arrays.is_consistent() {
            warn!(
                ids = arrays.ids.len(),
                creators = arrays.creators.len(),
                amounts = arrays.amounts.len(),
                cids = arrays.metadata_cids.len(),
                "active bounty arrays differ in length, treating as no data"
            );
            return Ok(Vec::new());
        }

        let bounties: Vec<RawBounty> = arrays
            .ids
            .into_iter()
            .zip(arrays.creators)
            .zip(arrays.amounts)
            .zip(arrays.metadata_cids)
            .map(|(((id, creator), amount), metadata_cid)| RawBounty {
                id,
                creator,
                amount,
                status: BountyStatus::Active,
                metadata_cid,
            })
            .collect();

        debug!(count = bounties.len(), "decoded active bounties");
        Ok(bounties)
    }

    pub async fn submission_count(&self, bounty_id: BountyId) -> u64 {
        match self.contract.submission_count(bounty_id).await {
            Ok(count) => count,
            Err(e) => {
                warn!(bounty_id, error = %e, "submission count read failed, using 0");
                0
            }
        }
    }

    /// The hunter's submission, if any. An empty description CID is how the
    /// contract says "no submission".
    pub async fn submission(&self, bounty_id: BountyId, hunter: &Address) -> Option<Submission> {
        match self.contract.submission(bounty_id, hunter).await {
            Ok(cid) if !cid.is_empty() => Some(Submission {
                hunter: hunter.clone(),
                description_cid: cid,
            }),
            Ok(_) => None,
            Err(e) => {
                warn!(bounty_id, hunter = %hunter, error = %e, "submission lookup failed");
                None
            }
        }
    }

    /// Every submission on a bounty. Falls back to listing submitters and
    /// reading each one when the aggregate read is unavailable; submitters
    /// whose lookup fails or comes back empty are skipped.
    pub async fn all_submissions(&self, bounty_id: BountyId) -> Vec<Submission> {
        match self.contract.all_submissions(bounty_id).await {
            Ok(submissions) => {
                debug!(bounty_id, count = submissions.len(), "fetched all submissions");
                submissions
            }
            Err(e) => {
                warn!(bounty_id, error = %e, "aggregate submission read failed, using fallback");
                self.submissions_by_submitter(bounty_id).await
            }
        }
    }

    async fn submissions_by_submitter(&self, bounty_id: BountyId) -> Vec<Submission> {
        let submitters = match self.contract.bounty_submitters(bounty_id).await {
            Ok(submitters) => submitters,
            Err(e) => {
                warn!(bounty_id, error = %e, "fallback submitter listing failed");
                return Vec::new();
            }
        };

        let mut submissions = Vec::with_capacity(submitters.len());
        for hunter in &submitters {
            if let Some(submission) = self.submission(bounty_id, hunter).await {
                submissions.push(submission);
            }
        }

        debug!(
            bounty_id,
            submitters = submitters.len(),
            valid = submissions.len(),
            "fallback submission read complete"
        );
        submissions
    }
}
