//! Invalidation signals from writers to whatever caches chain state
use async_trait::async_trait;

use crate::data_model::BountyId;

/// Told about confirmed writes so cached views can refresh.
#[async_trait]
pub trait BoardObserver: Send + Sync {
    /// Submissions or status of one bounty changed
    async fn bounty_changed(&self, bounty_id: BountyId);

    /// The set of active bounties changed
    async fn list_changed(&self);
}
