//! Messaging collaborators
//!
//! Identifiers and the traits through which the poll manager reaches the
//! message store, peer resolution and the user cache.

pub mod pending;

use crate::polls::Poll;
use crate::transport::{InputMediaPoll, InputPeer, TransportResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Local message identifier.
///
/// Negative values are provisional: the message is still queued locally and
/// the server has not assigned it an id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl MessageId {
    pub fn is_provisional(&self) -> bool {
        self.0 < 0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Internal peer (chat, user or channel) identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(pub i64);

/// User identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

/// A user record returned alongside a voter list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// What the message store knows about a message carrying a poll
#[derive(Debug, Clone, PartialEq)]
pub struct StoredMessage {
    /// Local id
    pub mid: MessageId,
    /// Peer the message belongs to
    pub peer_id: PeerId,
    /// Id the server uses for this message within its peer
    pub server_id: i64,
    /// Poll embedded in the message media, if any
    pub poll: Option<Poll>,
}

/// Message storage owned by the messaging layer
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Look up a message by local id
    fn message(&self, mid: MessageId) -> Option<StoredMessage>;

    /// Replace the media of a sent message
    async fn edit_message_media(&self, mid: MessageId, media: InputMediaPoll) -> TransportResult<()>;

    /// Wait until a provisional message has been acknowledged by the server.
    ///
    /// Returns the message's final local id, or `None` if the send was
    /// abandoned.
    async fn wait_until_sent(&self, mid: MessageId) -> Option<MessageId>;
}

/// Maps internal peer ids to wire peer references
pub trait PeerResolver: Send + Sync {
    fn input_peer(&self, peer: PeerId) -> InputPeer;
}

/// User cache fed by voter-list responses
pub trait UserStore: Send + Sync {
    fn save_users(&self, users: &[User]);
}
