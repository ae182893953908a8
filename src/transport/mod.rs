//! RPC Transport
//!
//! Generic request/response seam used for the outbound poll operations.

use crate::messages::{User, UserId};
use crate::polls::{OptionKey, Poll};
use crate::text::MessageEntity;
use crate::updates::Updates;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Errors surfaced by the transport
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("RPC error {code}: {message}")]
    Rpc { code: i32, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Unexpected response: expected {expected}, got {got}")]
    UnexpectedResponse {
        expected: &'static str,
        got: &'static str,
    },
}

/// Wire reference to a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputPeer {
    /// The current user
    #[serde(rename = "self")]
    SelfPeer,
    User { user_id: i64, access_hash: i64 },
    Chat { chat_id: i64 },
    Channel { channel_id: i64, access_hash: i64 },
}

/// Outbound poll requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum ApiRequest {
    #[serde(rename = "messages.sendVote")]
    SendVote {
        peer: InputPeer,
        msg_id: i64,
        options: Vec<OptionKey>,
    },
    #[serde(rename = "messages.getPollResults")]
    GetPollResults { peer: InputPeer, msg_id: i64 },
    #[serde(rename = "messages.getPollVotes")]
    GetPollVotes {
        peer: InputPeer,
        id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        option: Option<OptionKey>,
        #[serde(skip_serializing_if = "Option::is_none")]
        offset: Option<String>,
        limit: u32,
    },
}

impl ApiRequest {
    /// Wire method name
    pub fn method(&self) -> &'static str {
        match self {
            Self::SendVote { .. } => "messages.sendVote",
            Self::GetPollResults { .. } => "messages.getPollResults",
            Self::GetPollVotes { .. } => "messages.getPollVotes",
        }
    }
}

/// Responses to [`ApiRequest`]s
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Updates(Updates),
    VotesList(VotesList),
}

impl ApiResponse {
    fn kind(&self) -> &'static str {
        match self {
            Self::Updates(_) => "updates",
            Self::VotesList(_) => "votes_list",
        }
    }

    pub fn into_updates(self) -> TransportResult<Updates> {
        match self {
            Self::Updates(updates) => Ok(updates),
            other => Err(TransportError::UnexpectedResponse {
                expected: "updates",
                got: other.kind(),
            }),
        }
    }

    pub fn into_votes_list(self) -> TransportResult<VotesList> {
        match self {
            Self::VotesList(list) => Ok(list),
            other => Err(TransportError::UnexpectedResponse {
                expected: "votes_list",
                got: other.kind(),
            }),
        }
    }
}

/// One voter and the answers they picked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollVoter {
    pub user_id: UserId,
    #[serde(default)]
    pub options: Vec<OptionKey>,
    /// Unix seconds
    pub date: i64,
}

/// One page of a poll's voter list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VotesList {
    pub count: u32,
    #[serde(default)]
    pub votes: Vec<PollVoter>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<String>,
}

/// Media payload used to create or edit a poll message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMediaPoll {
    pub poll: Poll,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answers: Option<Vec<OptionKey>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_entities: Option<Vec<MessageEntity>>,
}

/// Request/response transport
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn invoke(&self, request: ApiRequest) -> TransportResult<ApiResponse>;
}
