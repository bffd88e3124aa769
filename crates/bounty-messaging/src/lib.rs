//! Optional per-bounty chat between creators and hunters.
//!
//! Nothing in the write workflows waits on this crate; a missing or broken
//! transport only means no chat.

pub mod channel;
pub mod feed;
pub mod message;

pub use channel::{compose, InMemoryChannel, MessageChannel, Subscription};
pub use feed::MessageFeed;
pub use message::{BountyMessage, MessageType};
