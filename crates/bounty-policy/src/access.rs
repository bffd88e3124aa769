//! Who may see submission details
//!
//! Missing data never grants access: an unknown bounty, a disconnected
//! viewer or submission data still loading all answer `false`.

use bounty_core::{Address, EnhancedBounty};

/// True when `viewer` created the bounty or submitted to it.
pub fn can_view_submission_details(bounty: Option<&EnhancedBounty>, viewer: Option<&Address>) -> bool {
    let (Some(bounty), Some(viewer)) = (bounty, viewer) else {
        return false;
    };
    if bounty.is_loading_submissions {
        return false;
    }

    if bounty.creator.same_as(viewer) {
        return true;
    }
    bounty
        .user_submission
        .as_ref()
        .map(|s| s.hunter.same_as(viewer))
        .unwrap_or(false)
}

/// Creator check only; independent of submission loading.
pub fn is_bounty_creator(bounty: Option<&EnhancedBounty>, viewer: Option<&Address>) -> bool {
    match (bounty, viewer) {
        (Some(bounty), Some(viewer)) => bounty.creator.same_as(viewer),
        _ => false,
    }
}
