//! My-Bounties projection: the connected creator's bounties
//!
//! Submission detail is loaded per bounty on expand and kept for the session;
//! only an explicit `refresh` reads it again.
use std::collections::HashMap;
use std::sync::Arc;

use bounty_chain::ChainReader;
use bounty_core::{format_units, Address, BountyId, BountyStatus, EnhancedBounty, Submission, REWARD_DECIMALS};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::aggregator::BountyAggregator;

/// Bounties created by `creator`, in source order.
pub fn filter_by_creator(bounties: &[EnhancedBounty], creator: &Address) -> Vec<EnhancedBounty> {
    bounties
        .iter()
        .filter(|b| b.creator.same_as(creator))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BountyDetail {
    pub submission_count: u64,
    pub submissions: Vec<Submission>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyBountyStats {
    pub total: u64,
    pub active: u64,
    pub completed: u64,
    pub cancelled: u64,
    /// Decimal reward sums
    pub total_value: String,
    pub active_value: String,
    pub total_submissions: u64,
}

/// Single pass over the creator's bounties. Loaded detail counts win over
/// the aggregator's `applicants`.
pub fn compute_stats(bounties: &[EnhancedBounty], details: &HashMap<BountyId, BountyDetail>) -> MyBountyStats {
    let mut stats = MyBountyStats::default();
    let mut total_value: u128 = 0;
    let mut active_value: u128 = 0;

    for bounty in bounties {
        stats.total += 1;
        total_value = total_value.saturating_add(bounty.raw_amount);
        stats.total_submissions += details
            .get(&bounty.id)
            .map(|d| d.submission_count)
            .unwrap_or(bounty.applicants);

        match bounty.status {
            BountyStatus::Active => {
                stats.active += 1;
                active_value = active_value.saturating_add(bounty.raw_amount);
            }
            BountyStatus::Completed => stats.completed += 1,
            BountyStatus::Cancelled => stats.cancelled += 1,
        }
    }

    stats.total_value = format_units(total_value, REWARD_DECIMALS);
    stats.active_value = format_units(active_value, REWARD_DECIMALS);
    stats
}

pub struct MyBounties {
    aggregator: Arc<BountyAggregator>,
    reader: ChainReader,
    details: RwLock<HashMap<BountyId, BountyDetail>>,
}

impl MyBounties {
    pub fn new(aggregator: Arc<BountyAggregator>) -> Self {
        let reader = aggregator.reader().clone();
        Self {
            aggregator,
            reader,
            details: RwLock::new(HashMap::new()),
        }
    }

    /// The viewer's bounties; empty when no wallet is connected.
    pub async fn bounties(&self) -> Vec<EnhancedBounty> {
        match self.aggregator.viewer().await {
            Some(viewer) => filter_by_creator(&self.aggregator.bounties().await, &viewer),
            None => Vec::new(),
        }
    }

    pub async fn owned(&self, bounty_id: BountyId) -> Option<EnhancedBounty> {
        self.bounties().await.into_iter().find(|b| b.id == bounty_id)
    }

    /// Load submission detail for one owned bounty. A second expand returns
    /// the cached detail without touching the chain.
    pub async fn expand(&self, bounty_id: BountyId) -> Option<BountyDetail> {
        if let Some(detail) = self.details.read().await.get(&bounty_id) {
            return Some(detail.clone());
        }
        self.load(bounty_id).await
    }

    /// Re-read detail for one bounty, bypassing the expand cache.
    pub async fn refresh(&self, bounty_id: BountyId) -> Option<BountyDetail> {
        self.aggregator.refresh(bounty_id).await;
        self.load(bounty_id).await
    }

    async fn load(&self, bounty_id: BountyId) -> Option<BountyDetail> {
        self.owned(bounty_id).await?;

        let (submission_count, submissions) = tokio::join!(
            self.reader.submission_count(bounty_id),
            self.reader.all_submissions(bounty_id),
        );
        let detail = BountyDetail {
            submission_count,
            submissions,
        };
        debug!(bounty_id, count = detail.submission_count, "bounty detail loaded");

        self.details.write().await.insert(bounty_id, detail.clone());
        Some(detail)
    }

    /// Cached detail only
    pub async fn detail(&self, bounty_id: BountyId) -> Option<BountyDetail> {
        self.details.read().await.get(&bounty_id).cloned()
    }

    pub async fn is_expanded(&self, bounty_id: BountyId) -> bool {
        self.details.read().await.contains_key(&bounty_id)
    }

    /// Recomputed on every call from the current view and loaded detail.
    pub async fn stats(&self) -> MyBountyStats {
        let bounties = self.bounties().await;
        let details = self.details.read().await;
        compute_stats(&bounties, &details)
    }
}
