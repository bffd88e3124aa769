//! Bounty View Aggregator
//!
//! Merges chain records with resolved metadata into [`EnhancedBounty`]
//! records. A rebuild shows placeholders immediately, then resolves every
//! bounty concurrently; results are applied by bounty id as they land.
//!
//! Two counters keep concurrent updates honest:
//! - `generation` bumps on every rebuild; results from an older rebuild are
//!   dropped.
//! - each bounty's submission data carries a ticket; only the newest ticket
//!   for that bounty may write `applicants` and the viewer's submission.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bounty_chain::ChainReader;
use bounty_core::{
    Address, BoardObserver, BountyId, BountyMetadata, EnhancedBounty, RawBounty, Result,
    Submission,
};
use bounty_metadata::MetadataCache;
use bounty_policy::access;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Board-wide counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardStats {
    /// Every bounty ever created
    pub total: u64,
    pub active: u64,
    /// Paid or cancelled
    pub completed: u64,
}

#[derive(Default)]
struct AggregatorState {
    viewer: Option<Address>,
    raw: Vec<RawBounty>,
    bounties: Vec<EnhancedBounty>,
    total: u64,
    version: u64,
    dirty: bool,
    generation: u64,
    next_ticket: u64,
    tickets: HashMap<BountyId, u64>,
}

impl AggregatorState {
    fn issue_ticket(&mut self, bounty_id: BountyId) -> u64 {
        self.next_ticket += 1;
        self.tickets.insert(bounty_id, self.next_ticket);
        self.next_ticket
    }

    fn holds_ticket(&self, bounty_id: BountyId, ticket: u64) -> bool {
        self.tickets.get(&bounty_id) == Some(&ticket)
    }

    fn find(&self, bounty_id: BountyId) -> Option<&EnhancedBounty> {
        self.bounties.iter().find(|b| b.id == bounty_id)
    }

    fn find_mut(&mut self, bounty_id: BountyId) -> Option<&mut EnhancedBounty> {
        self.bounties.iter_mut().find(|b| b.id == bounty_id)
    }
}

struct Resolved {
    bounty_id: BountyId,
    ticket: u64,
    metadata: Option<BountyMetadata>,
    count: u64,
    own: Option<Submission>,
}

pub struct BountyAggregator {
    reader: ChainReader,
    cache: Arc<MetadataCache>,
    state: RwLock<AggregatorState>,
}

impl BountyAggregator {
    pub fn new(reader: ChainReader, cache: Arc<MetadataCache>) -> Self {
        Self {
            reader,
            cache,
            state: RwLock::new(AggregatorState::default()),
        }
    }

    pub fn with_viewer(mut self, viewer: Option<Address>) -> Self {
        self.state.get_mut().viewer = viewer;
        self
    }

    pub fn reader(&self) -> &ChainReader {
        &self.reader
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    pub async fn viewer(&self) -> Option<Address> {
        self.state.read().await.viewer.clone()
    }

    /// Change the connected account. The next `sync` rebuilds so every
    /// bounty's own-submission lookup uses the new viewer.
    pub async fn set_viewer(&self, viewer: Option<Address>) {
        let mut state = self.state.write().await;
        let changed = match (&state.viewer, &viewer) {
            (Some(old), Some(new)) => !old.same_as(new),
            (None, None) => false,
            _ => true,
        };
        if changed {
            state.viewer = viewer;
            state.dirty = true;
        }
    }

    /// Force the next `sync` to rebuild even if the listing length is unchanged.
    pub async fn invalidate(&self) {
        self.state.write().await.dirty = true;
    }

    /// Read the active listing and rebuild when it changed. Returns whether a
    /// rebuild happened.
    ///
    /// The length of the listing is the change signal. An empty listing never
    /// replaces a populated one unless the view was invalidated, since a
    /// half-settled read also decodes to empty.
    pub async fn sync(&self) -> Result<bool> {
        let (raw, total) = tokio::join!(self.reader.all_active_bounties(), self.reader.bounty_count());
        let raw = raw?;

        let rebuild = {
            let mut state = self.state.write().await;
            match total {
                Ok(total) => state.total = total,
                Err(e) => warn!(error = %e, "bounty count read failed, keeping previous total"),
            }
            let length_changed = raw.len() != state.raw.len();
            state.dirty || (length_changed && !raw.is_empty())
        };

        if !rebuild {
            debug!(count = raw.len(), "active listing unchanged");
            return Ok(false);
        }
        self.rebuild(raw).await;
        Ok(true)
    }

    async fn rebuild(&self, raw: Vec<RawBounty>) {
        let (generation, viewer, tickets) = {
            let mut state = self.state.write().await;
            state.generation += 1;
            state.dirty = false;
            state.version += 1;
            state.bounties = raw.iter().map(EnhancedBounty::loading).collect();
            state.raw = raw.clone();
            let tickets: Vec<u64> = raw.iter().map(|b| state.issue_ticket(b.id)).collect();
            (state.generation, state.viewer.clone(), tickets)
        };
        info!(generation, count = raw.len(), "rebuilding bounty view");

        let mut tasks = JoinSet::new();
        for (bounty, ticket) in raw.into_iter().zip(tickets) {
            let reader = self.reader.clone();
            let cache = self.cache.clone();
            let viewer = viewer.clone();
            tasks.spawn(async move {
                let (metadata, count, own) = tokio::join!(
                    cache.fetch(&bounty.metadata_cid),
                    reader.submission_count(bounty.id),
                    own_submission(&reader, bounty.id, viewer.as_ref()),
                );
                Resolved {
                    bounty_id: bounty.id,
                    ticket,
                    metadata,
                    count,
                    own,
                }
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(resolved) => self.apply_resolved(generation, resolved).await,
                Err(e) => warn!(error = %e, "bounty resolution task failed"),
            }
        }
    }

    async fn apply_resolved(&self, generation: u64, resolved: Resolved) {
        let mut state = self.state.write().await;
        if state.generation != generation {
            debug!(bounty_id = resolved.bounty_id, generation, "dropping result from superseded rebuild");
            return;
        }

        let submissions_current = state.holds_ticket(resolved.bounty_id, resolved.ticket);
        let Some(bounty) = state.find_mut(resolved.bounty_id) else {
            return;
        };
        bounty.apply_metadata(resolved.metadata.as_ref());
        if submissions_current {
            bounty.apply_submissions(resolved.count, resolved.own);
        } else {
            debug!(bounty_id = resolved.bounty_id, "newer submission data already requested");
        }
        state.version += 1;
    }

    /// Re-read one bounty's submission count and the viewer's submission and
    /// replace them in place. Metadata is not re-fetched. Returns false if
    /// the bounty is not in view or a newer update superseded this one.
    ///
    /// The bounty shows `is_loading_submissions` until the newest ticket
    /// holder applies its result.
    pub async fn refresh(&self, bounty_id: BountyId) -> bool {
        let (ticket, viewer) = {
            let mut state = self.state.write().await;
            let Some(bounty) = state.find_mut(bounty_id) else {
                return false;
            };
            bounty.is_loading_submissions = true;
            state.version += 1;
            (state.issue_ticket(bounty_id), state.viewer.clone())
        };

        let (count, own) = tokio::join!(
            self.reader.submission_count(bounty_id),
            own_submission(&self.reader, bounty_id, viewer.as_ref()),
        );

        let mut state = self.state.write().await;
        if !state.holds_ticket(bounty_id, ticket) {
            debug!(bounty_id, "refresh superseded");
            return false;
        }
        let Some(bounty) = state.find_mut(bounty_id) else {
            return false;
        };
        bounty.apply_submissions(count, own);
        state.version += 1;
        debug!(bounty_id, applicants = count, "bounty refreshed");
        true
    }

    pub async fn bounties(&self) -> Vec<EnhancedBounty> {
        self.state.read().await.bounties.clone()
    }

    pub async fn bounty(&self, bounty_id: BountyId) -> Option<EnhancedBounty> {
        self.state.read().await.find(bounty_id).cloned()
    }

    /// Bumps on every visible change.
    pub async fn version(&self) -> u64 {
        self.state.read().await.version
    }

    pub async fn stats(&self) -> BoardStats {
        let state = self.state.read().await;
        let active = state.raw.len() as u64;
        BoardStats {
            total: state.total,
            active,
            completed: state.total.saturating_sub(active),
        }
    }

    pub async fn can_view_submission_details(&self, bounty_id: BountyId, viewer: Option<&Address>) -> bool {
        let state = self.state.read().await;
        access::can_view_submission_details(state.find(bounty_id), viewer)
    }

    pub async fn is_bounty_creator(&self, bounty_id: BountyId, viewer: Option<&Address>) -> bool {
        let state = self.state.read().await;
        access::is_bounty_creator(state.find(bounty_id), viewer)
    }

    pub async fn has_user_submitted(&self, bounty_id: BountyId) -> bool {
        self.user_submission(bounty_id).await.is_some()
    }

    pub async fn user_submission(&self, bounty_id: BountyId) -> Option<Submission> {
        self.state
            .read()
            .await
            .find(bounty_id)
            .and_then(|b| b.user_submission.clone())
    }

    /// Every submission on the bounty, straight from the chain.
    pub async fn all_submissions(&self, bounty_id: BountyId) -> Vec<Submission> {
        self.reader.all_submissions(bounty_id).await
    }

    pub async fn is_loading_metadata(&self) -> bool {
        self.state.read().await.bounties.iter().any(|b| b.is_loading)
    }

    pub async fn is_loading_submissions(&self) -> bool {
        self.state
            .read()
            .await
            .bounties
            .iter()
            .any(|b| b.is_loading_submissions)
    }
}

async fn own_submission(
    reader: &ChainReader,
    bounty_id: BountyId,
    viewer: Option<&Address>,
) -> Option<Submission> {
    match viewer {
        Some(viewer) => reader.submission(bounty_id, viewer).await,
        None => None,
    }
}

#[async_trait]
impl BoardObserver for BountyAggregator {
    async fn bounty_changed(&self, bounty_id: BountyId) {
        self.refresh(bounty_id).await;
    }

    async fn list_changed(&self) {
        self.invalidate().await;
        if let Err(e) = self.sync().await {
            warn!(error = %e, "resync after list change failed");
        }
    }
}
