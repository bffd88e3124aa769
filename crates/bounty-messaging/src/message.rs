use bounty_core::{Address, BountyId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Application,
    Question,
    Update,
    Payment,
}

/// One chat line attached to a bounty. `timestamp` is milliseconds since
/// the Unix epoch as stamped by the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BountyMessage {
    pub bounty_id: BountyId,
    pub sender: Address,
    pub message: String,
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub message_type: MessageType,
}

impl BountyMessage {
    /// Identity used for dedup; delivery is at-least-once.
    pub fn dedup_key(&self) -> (String, i64, &str) {
        (self.sender.as_str().to_lowercase(), self.timestamp, self.message.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let msg = BountyMessage {
            bounty_id: 3,
            sender: Address::new("0xAbC"),
            message: "Is this still open?".to_string(),
            timestamp: 1_700_000_000_000,
            message_type: MessageType::Question,
        };

        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["bountyId"], 3);
        assert_eq!(json["type"], "question");
        assert_eq!(json["sender"], "0xAbC");
    }
}
