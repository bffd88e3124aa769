//! Consumer-side view of one bounty's conversation
use std::collections::HashSet;
use std::sync::Arc;

use bounty_core::{Address, BountyId};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::channel::Subscription;
use crate::message::BountyMessage;

type SeenKey = (String, i64, String);

#[derive(Default)]
struct FeedState {
    messages: Vec<BountyMessage>,
    seen: HashSet<SeenKey>,
}

pub struct MessageFeed {
    bounty_id: BountyId,
    viewer: Option<Address>,
    state: RwLock<FeedState>,
}

impl MessageFeed {
    pub fn new(bounty_id: BountyId, viewer: Option<Address>) -> Self {
        Self {
            bounty_id,
            viewer,
            state: RwLock::new(FeedState::default()),
        }
    }

    pub fn bounty_id(&self) -> BountyId {
        self.bounty_id
    }

    /// Apply one delivery. Returns false for other bounties and repeats.
    pub async fn receive(&self, message: BountyMessage) -> bool {
        if message.bounty_id != self.bounty_id {
            return false;
        }

        let (sender, timestamp, body) = message.dedup_key();
        let key = (sender, timestamp, body.to_string());
        let mut state = self.state.write().await;
        if !state.seen.insert(key) {
            debug!(bounty_id = self.bounty_id, "duplicate message dropped");
            return false;
        }

        let at = state
            .messages
            .partition_point(|m| m.timestamp <= message.timestamp);
        state.messages.insert(at, message);
        true
    }

    /// Oldest first
    pub async fn messages(&self) -> Vec<BountyMessage> {
        self.state.read().await.messages.clone()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.messages.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn is_from_current_user(&self, message: &BountyMessage) -> bool {
        self.viewer
            .as_ref()
            .map(|viewer| viewer.same_as(&message.sender))
            .unwrap_or(false)
    }

    /// Feed every delivery from `subscription` into this feed until the
    /// transport closes or the task is aborted.
    pub fn follow(self: &Arc<Self>, mut subscription: Subscription) -> JoinHandle<()> {
        let feed = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                feed.receive(message).await;
            }
        })
    }
}
