//! Pre-flight eligibility for submit, cancel and pay

use bounty_core::{Address, BountyError, BountyId, EnhancedBounty, Result};

/// Chain facts gathered before a submission, in the order they are read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitFacts {
    pub active: bool,
    /// `None` when the bounty record could not be read
    pub creator: Option<Address>,
    pub already_submitted: bool,
}

pub fn require_connected(viewer: Option<&Address>) -> Result<&Address> {
    viewer.ok_or(BountyError::NotConnected)
}

pub fn check_contract_deployed(has_code: bool, address: &Address) -> Result<()> {
    if has_code {
        Ok(())
    } else {
        Err(BountyError::ContractNotFound(address.to_string()))
    }
}

/// First failing rule wins: inactive, own bounty, duplicate.
pub fn check_submit_eligibility(bounty_id: BountyId, hunter: &Address, facts: &SubmitFacts) -> Result<()> {
    if !facts.active {
        return Err(BountyError::InactiveBounty(bounty_id));
    }
    if facts
        .creator
        .as_ref()
        .map(|creator| creator.same_as(hunter))
        .unwrap_or(false)
    {
        return Err(BountyError::SelfSubmission);
    }
    if facts.already_submitted {
        return Err(BountyError::AlreadySubmitted);
    }
    Ok(())
}

/// Cancel is open to the connected creator of an active bounty from their
/// own list.
pub fn check_cancel(
    bounty_id: BountyId,
    viewer: Option<&Address>,
    owned: Option<&EnhancedBounty>,
) -> Result<()> {
    let viewer = require_connected(viewer)?;
    let bounty = owned.ok_or_else(|| {
        BountyError::NotFound(format!("Bounty #{} not found in your bounties", bounty_id))
    })?;

    if !bounty.is_active() {
        return Err(BountyError::Validation(format!(
            "Cannot cancel bounty #{} - status is {} (not active)",
            bounty_id, bounty.status
        )));
    }
    if !bounty.creator.same_as(viewer) {
        return Err(BountyError::Validation(format!(
            "Cannot cancel bounty #{} - you are not the creator",
            bounty_id
        )));
    }
    Ok(())
}
