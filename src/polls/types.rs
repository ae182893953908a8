//! Poll Types
//!
//! Cached poll definitions, the partial poll objects the server pushes, and
//! the result snapshots that accompany them.

use crate::messages::UserId;
use crate::text::MessageEntity;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Server-assigned poll identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollId(pub String);

impl PollId {
    /// Create a poll ID from a string
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for PollId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PollId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PollId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Opaque byte key identifying one answer within a poll.
///
/// Serialized as standard base64 so snapshots survive a round trip through
/// JSON. Only ever compared for equality.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct OptionKey(Bytes);

impl OptionKey {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&'static str> for OptionKey {
    fn from(key: &'static str) -> Self {
        Self(Bytes::from_static(key.as_bytes()))
    }
}

impl std::fmt::Debug for OptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OptionKey({})", hex::encode(&self.0))
    }
}

impl Serialize for OptionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for OptionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let decoded = STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)?;
        Ok(Self(Bytes::from(decoded)))
    }
}

/// One selectable answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAnswer {
    /// Display text
    pub text: String,
    /// Key sent to the server when voting for this answer
    pub option: OptionKey,
}

impl PollAnswer {
    pub fn new(text: impl Into<String>, option: impl Into<OptionKey>) -> Self {
        Self {
            text: text.into(),
            option: option.into(),
        }
    }
}

/// Poll flag set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PollFlags {
    #[serde(default)]
    pub closed: bool,
    #[serde(default)]
    pub public_voters: bool,
    #[serde(default)]
    pub multiple_choice: bool,
    #[serde(default)]
    pub quiz: bool,
}

/// Presentation fields derived once, when a poll is first seen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedPoll {
    /// Question rendered to display markup
    pub question: String,
    /// Emoji-prefixed label used when replying to the poll message
    pub reply: String,
}

/// A poll as held in the cache.
///
/// `rendered` and `chosen_indexes` are owned by [`PollCache`](super::PollCache);
/// the server never sends them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answers: Vec<PollAnswer>,
    /// Seconds the poll stays open after creation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_period: Option<u32>,
    /// Unix timestamp (seconds) at which the poll closes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<i64>,
    #[serde(default)]
    pub flags: PollFlags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered: Option<RenderedPoll>,
    /// Answer indexes the current user voted for, ascending
    #[serde(default)]
    pub chosen_indexes: Vec<usize>,
}

impl Poll {
    /// Create a poll with the given question and answers
    pub fn new(id: impl Into<PollId>, question: impl Into<String>, answers: Vec<PollAnswer>) -> Self {
        Self {
            id: id.into(),
            question: question.into(),
            answers,
            close_period: None,
            close_date: None,
            flags: PollFlags::default(),
            rendered: None,
            chosen_indexes: Vec::new(),
        }
    }

    /// Set flags
    pub fn with_flags(mut self, flags: PollFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Set close date (Unix seconds)
    pub fn with_close_date(mut self, close_date: i64) -> Self {
        self.close_date = Some(close_date);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.flags.closed
    }

    /// Index of the answer carrying `key`, if any
    pub fn answer_index(&self, key: &OptionKey) -> Option<usize> {
        self.answers.iter().position(|answer| &answer.option == key)
    }

    /// Close date as a UTC timestamp
    pub fn close_date_utc(&self) -> Option<DateTime<Utc>> {
        self.close_date
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
    }

    /// Field-by-field override merge.
    ///
    /// Fields present on `incoming` replace the cached ones; absent fields and
    /// the cache-owned fields are kept. Chosen indexes are remapped when the
    /// answer list is replaced.
    pub fn merge(&mut self, incoming: IncomingPoll) {
        debug_assert_eq!(self.id, incoming.id);

        if let Some(question) = incoming.question {
            self.question = question;
        }
        if let Some(answers) = incoming.answers {
            // Chosen answers follow their option key into the new list.
            let mut chosen: Vec<usize> = self
                .chosen_indexes
                .iter()
                .filter_map(|&index| self.answers.get(index))
                .filter_map(|old| answers.iter().position(|answer| answer.option == old.option))
                .collect();
            chosen.sort_unstable();
            chosen.dedup();
            self.chosen_indexes = chosen;
            self.answers = answers;
        }
        if let Some(close_period) = incoming.close_period {
            self.close_period = Some(close_period);
        }
        if let Some(close_date) = incoming.close_date {
            self.close_date = Some(close_date);
        }
        if let Some(flags) = incoming.flags {
            self.flags = flags;
        }
    }
}

impl From<IncomingPoll> for Poll {
    fn from(incoming: IncomingPoll) -> Self {
        Self {
            id: incoming.id,
            question: incoming.question.unwrap_or_default(),
            answers: incoming.answers.unwrap_or_default(),
            close_period: incoming.close_period,
            close_date: incoming.close_date,
            flags: incoming.flags.unwrap_or_default(),
            rendered: None,
            chosen_indexes: Vec::new(),
        }
    }
}

/// A poll object as pushed by the server.
///
/// Only `id` is guaranteed; an update may reference a poll by id alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomingPoll {
    pub id: PollId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<PollAnswer>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_period: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<PollFlags>,
}

impl IncomingPoll {
    /// A poll reference carrying nothing but its id
    pub fn id_only(id: PollId) -> Self {
        Self {
            id,
            question: None,
            answers: None,
            close_period: None,
            close_date: None,
            flags: None,
        }
    }
}

impl From<Poll> for IncomingPoll {
    fn from(poll: Poll) -> Self {
        Self {
            id: poll.id,
            question: Some(poll.question),
            answers: Some(poll.answers),
            close_period: poll.close_period,
            close_date: poll.close_date,
            flags: Some(poll.flags),
        }
    }
}

/// Voter count for a single answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollAnswerVoters {
    pub option: OptionKey,
    pub voters: u32,
    /// The current user voted for this answer. Absent means not chosen.
    #[serde(default)]
    pub chosen: bool,
    /// Quiz mode: this answer is correct
    #[serde(default)]
    pub correct: bool,
}

impl PollAnswerVoters {
    pub fn new(option: impl Into<OptionKey>, voters: u32) -> Self {
        Self {
            option: option.into(),
            voters,
            chosen: false,
            correct: false,
        }
    }

    /// Mark as chosen by the current user
    pub fn chosen(mut self) -> Self {
        self.chosen = true;
        self
    }

    /// Mark as the correct quiz answer
    pub fn correct(mut self) -> Self {
        self.correct = true;
        self
    }
}

/// Result snapshot for one poll.
///
/// A `min` snapshot omits per-user detail; its `chosen` flags are not
/// meaningful.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PollResults {
    #[serde(default)]
    pub min: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<PollAnswerVoters>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_voters: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_voters: Option<Vec<UserId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution_entities: Option<Vec<MessageEntity>>,
}

impl PollResults {
    /// Full snapshot with the given per-answer results
    pub fn full(results: Vec<PollAnswerVoters>) -> Self {
        let total = results.iter().map(|r| r.voters).fold(0u32, u32::saturating_add);
        Self {
            min: false,
            results: Some(results),
            total_voters: Some(total),
            ..Self::default()
        }
    }

    /// Partial snapshot with the given per-answer results
    pub fn partial(results: Vec<PollAnswerVoters>) -> Self {
        Self {
            min: true,
            ..Self::full(results)
        }
    }

    /// Per-answer results, empty when the snapshot carries none
    pub fn answers(&self) -> &[PollAnswerVoters] {
        self.results.as_deref().unwrap_or_default()
    }
}
