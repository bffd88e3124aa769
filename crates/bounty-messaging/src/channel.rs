//! Message transport boundary and an in-process broadcast implementation
use async_trait::async_trait;
use bounty_core::{Address, BountyError, BountyId, Result};
use chrono::Utc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::message::{BountyMessage, MessageType};

/// Messages buffered per subscriber before the oldest are dropped
const TOPIC_BUFFER: usize = 256;

/// Live feed of one bounty's messages. Dropping it unsubscribes.
pub struct Subscription {
    bounty_id: BountyId,
    rx: mpsc::Receiver<BountyMessage>,
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn new(bounty_id: BountyId, rx: mpsc::Receiver<BountyMessage>, task: JoinHandle<()>) -> Self {
        Self { bounty_id, rx, task }
    }

    pub fn bounty_id(&self) -> BountyId {
        self.bounty_id
    }

    /// Next delivered message; `None` once the transport closed.
    pub async fn recv(&mut self) -> Option<BountyMessage> {
        self.rx.recv().await
    }

    /// Same as dropping the subscription.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Peer-to-peer chat over bounties. Delivery is at-least-once, so
/// consumers deduplicate.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn subscribe(&self, bounty_id: BountyId) -> Result<Subscription>;

    async fn send(
        &self,
        sender: Option<&Address>,
        bounty_id: BountyId,
        message: &str,
        message_type: MessageType,
    ) -> Result<BountyMessage>;
}

/// Shared check for every transport: a wallet and a non-blank body.
pub fn compose(
    sender: Option<&Address>,
    bounty_id: BountyId,
    message: &str,
    message_type: MessageType,
) -> Result<BountyMessage> {
    let sender = sender.ok_or(BountyError::NotConnected)?;
    let message = message.trim();
    if message.is_empty() {
        return Err(BountyError::Validation("Message cannot be empty".to_string()));
    }
    Ok(BountyMessage {
        bounty_id,
        sender: sender.clone(),
        message: message.to_string(),
        timestamp: Utc::now().timestamp_millis(),
        message_type,
    })
}

/// Every bounty shares one topic, as on a gossip network; subscribers
/// filter for their bounty.
pub struct InMemoryChannel {
    topic: broadcast::Sender<BountyMessage>,
}

impl Default for InMemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChannel {
    pub fn new() -> Self {
        let (topic, _) = broadcast::channel(TOPIC_BUFFER);
        Self { topic }
    }

    /// Put an already stamped message on the topic, duplicates included.
    pub fn publish(&self, message: BountyMessage) {
        // No receivers is fine; the message is simply not seen.
        let _ = self.topic.send(message);
    }

    pub fn subscriber_count(&self) -> usize {
        self.topic.receiver_count()
    }
}

#[async_trait]
impl MessageChannel for InMemoryChannel {
    async fn subscribe(&self, bounty_id: BountyId) -> Result<Subscription> {
        let mut topic = self.topic.subscribe();
        let (tx, rx) = mpsc::channel(TOPIC_BUFFER);

        let task = tokio::spawn(async move {
            loop {
                match topic.recv().await {
                    Ok(msg) if msg.bounty_id == bounty_id => {
                        if tx.send(msg).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(bounty_id, skipped, "message subscriber lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            debug!(bounty_id, "message subscription ended");
        });

        Ok(Subscription::new(bounty_id, rx, task))
    }

    async fn send(
        &self,
        sender: Option<&Address>,
        bounty_id: BountyId,
        message: &str,
        message_type: MessageType,
    ) -> Result<BountyMessage> {
        let msg = compose(sender, bounty_id, message, message_type)?;
        debug!(bounty_id, sender = %msg.sender, kind = ?message_type, "message sent");
        self.publish(msg.clone());
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> Address {
        Address::new("0x00000000000000000000000000000000000000a1")
    }

    #[tokio::test]
    async fn test_subscriber_only_sees_its_bounty() {
        let channel = InMemoryChannel::new();
        let mut sub = channel.subscribe(1).await.unwrap();

        channel.send(Some(&alice()), 2, "other", MessageType::Question).await.unwrap();
        channel.send(Some(&alice()), 1, "mine", MessageType::Application).await.unwrap();

        let got = sub.recv().await.unwrap();
        assert_eq!(got.message, "mine");
        assert_eq!(got.message_type, MessageType::Application);
    }

    #[tokio::test]
    async fn test_blank_message_not_sent() {
        let channel = InMemoryChannel::new();
        let mut sub = channel.subscribe(1).await.unwrap();

        let err = channel.send(Some(&alice()), 1, "   ", MessageType::Update).await.unwrap_err();
        assert!(matches!(err, BountyError::Validation(_)));

        channel.send(Some(&alice()), 1, "real", MessageType::Update).await.unwrap();
        assert_eq!(sub.recv().await.unwrap().message, "real");
    }

    #[tokio::test]
    async fn test_send_requires_wallet() {
        let channel = InMemoryChannel::new();
        let err = channel.send(None, 1, "hi", MessageType::Question).await.unwrap_err();
        assert_eq!(err, BountyError::NotConnected);
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let channel = InMemoryChannel::new();
        let sub = channel.subscribe(1).await.unwrap();
        assert_eq!(channel.subscriber_count(), 1);

        sub.unsubscribe();
        for _ in 0..10 {
            if channel.subscriber_count() == 0 {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(channel.subscriber_count(), 0);
    }
}
