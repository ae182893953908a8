//! Poll Manager
//!
//! Outbound poll operations. Responses are routed back through the update
//! dispatcher, so the cache only ever changes on the in-order update path.

use super::actions::{build_vote_submission, compute_close_side_effect, input_media_poll, CloseOutcome};
use super::cache::{PollCache, PollEvent};
use super::types::{OptionKey, Poll};
use crate::config::PollsConfig;
use crate::error::{PollError, PollResult};
use crate::messages::{MessageId, MessageStore, PeerResolver, StoredMessage, UserStore};
use crate::text::TextProcessor;
use crate::transport::{ApiRequest, ApiTransport, InputMediaPoll, VotesList};
use crate::updates::UpdateDispatcher;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

/// Collaborators the manager calls out to
#[derive(Clone)]
pub struct PollDeps {
    pub messages: Arc<dyn MessageStore>,
    pub peers: Arc<dyn PeerResolver>,
    pub transport: Arc<dyn ApiTransport>,
    pub dispatcher: Arc<dyn UpdateDispatcher>,
    pub users: Arc<dyn UserStore>,
    pub text: Arc<dyn TextProcessor>,
}

/// Poll manager
pub struct PollManager {
    deps: PollDeps,
    cache: Arc<PollCache>,
    votes_page_limit: u32,
}

impl PollManager {
    /// Create a manager and register its cache with the dispatcher
    pub fn new(deps: PollDeps, config: &PollsConfig) -> Self {
        let cache = Arc::new(PollCache::new(deps.text.clone(), config));
        deps.dispatcher.register(cache.clone());
        Self {
            deps,
            cache,
            votes_page_limit: config.votes_page_limit,
        }
    }

    pub fn cache(&self) -> &Arc<PollCache> {
        &self.cache
    }

    /// Subscribe to poll-changed notifications
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.cache.subscribe()
    }

    /// Vote for the given answers of the poll in message `mid`.
    ///
    /// An empty selection retracts the vote. If the message is still queued
    /// locally the vote waits until the server acknowledges it.
    pub async fn send_vote(&self, mid: MessageId, indexes: &[usize]) -> PollResult<()> {
        let mut mid = mid;
        loop {
            let (message, poll) = self.resolve_poll(mid)?;
            let options = build_vote_submission(&poll, indexes)?;

            if mid.is_provisional() {
                debug!(mid = %mid, poll_id = %poll.id, "deferring vote until message is sent");
                mid = self
                    .deps
                    .messages
                    .wait_until_sent(mid)
                    .await
                    .ok_or(PollError::SendAborted(mid))?;
                info!(mid = %mid, poll_id = %poll.id, "releasing deferred vote");
                continue;
            }

            let request = ApiRequest::SendVote {
                peer: self.deps.peers.input_peer(message.peer_id),
                msg_id: message.server_id,
                options,
            };
            let updates = self.deps.transport.invoke(request).await?.into_updates()?;
            self.deps.dispatcher.process_updates(updates);
            return Ok(());
        }
    }

    /// Ask the server for fresh results; they arrive as updates
    pub async fn get_results(&self, mid: MessageId) -> PollResult<()> {
        let message = self.message(mid)?;
        let request = ApiRequest::GetPollResults {
            peer: self.deps.peers.input_peer(message.peer_id),
            msg_id: message.server_id,
        };
        let updates = self.deps.transport.invoke(request).await?.into_updates()?;
        self.deps.dispatcher.process_updates(updates);
        Ok(())
    }

    /// Fetch one page of the voter list, optionally for a single answer
    pub async fn get_votes(
        &self,
        mid: MessageId,
        option: Option<OptionKey>,
        offset: Option<String>,
        limit: Option<u32>,
    ) -> PollResult<VotesList> {
        let message = self.message(mid)?;
        let request = ApiRequest::GetPollVotes {
            peer: self.deps.peers.input_peer(message.peer_id),
            id: message.server_id,
            option,
            offset,
            limit: limit.unwrap_or(self.votes_page_limit),
        };
        let votes = self.deps.transport.invoke(request).await?.into_votes_list()?;
        self.deps.users.save_users(&votes.users);
        debug!(mid = %mid, count = votes.count, page = votes.votes.len(), "fetched poll votes");
        Ok(votes)
    }

    /// Close the poll in message `mid`. Closing a closed poll succeeds.
    pub async fn stop_poll(&self, mid: MessageId) -> PollResult<()> {
        let (_, poll) = self.resolve_poll(mid)?;
        let closed = match compute_close_side_effect(&poll) {
            CloseOutcome::NoOp => {
                debug!(mid = %mid, poll_id = %poll.id, "poll already closed");
                return Ok(());
            }
            CloseOutcome::Close(closed) => closed,
        };

        let media = self.input_media_poll(&closed, None, None);
        if let Err(e) = self.deps.messages.edit_message_media(mid, media).await {
            error!(mid = %mid, poll_id = %poll.id, error = %e, "failed to stop poll");
            return Err(e.into());
        }
        Ok(())
    }

    /// Build the media payload for sending or editing a poll
    pub fn input_media_poll(
        &self,
        poll: &Poll,
        correct_answers: Option<Vec<OptionKey>>,
        solution: Option<&str>,
    ) -> InputMediaPoll {
        input_media_poll(self.deps.text.as_ref(), poll, correct_answers, solution)
    }

    fn message(&self, mid: MessageId) -> PollResult<StoredMessage> {
        self.deps
            .messages
            .message(mid)
            .ok_or(PollError::MessageNotFound(mid))
    }

    /// The message and its poll, preferring the cached copy of the poll
    fn resolve_poll(&self, mid: MessageId) -> PollResult<(StoredMessage, Poll)> {
        let message = self.message(mid)?;
        let embedded = message.poll.as_ref().ok_or(PollError::NoPoll(mid))?;
        let poll = match self.cache.lookup(&embedded.id) {
            Some((cached, _)) => cached,
            None => embedded.clone(),
        };
        Ok((message, poll))
    }
}

impl std::fmt::Debug for PollManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollManager")
            .field("cache", &self.cache)
            .field("votes_page_limit", &self.votes_page_limit)
            .finish()
    }
}
