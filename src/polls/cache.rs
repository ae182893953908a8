//! Poll Cache
//!
//! Holds the latest known poll definitions and result snapshots, and
//! reconciles them against server pushes.

use super::types::{IncomingPoll, Poll, PollId, PollResults, RenderedPoll};
use crate::config::PollsConfig;
use crate::text::TextProcessor;
use crate::updates::{ServerUpdate, UpdateHandler};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace};

/// Published after a server update has been merged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollEvent {
    /// Poll state after the merge
    pub poll: Poll,
    /// Snapshot exactly as received
    pub results: PollResults,
}

/// Both maps live behind one lock so an entry is never half-created.
#[derive(Debug, Default)]
struct PollStore {
    polls: HashMap<PollId, Poll>,
    results: HashMap<PollId, PollResults>,
}

/// Poll cache and reconciler
pub struct PollCache {
    store: RwLock<PollStore>,
    text: Arc<dyn TextProcessor>,
    reply_emoji: String,
    reply_fallback: String,
    event_tx: broadcast::Sender<PollEvent>,
}

impl PollCache {
    /// Create an empty cache
    pub fn new(text: Arc<dyn TextProcessor>, config: &PollsConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.notification_capacity.max(1));
        Self {
            store: RwLock::new(PollStore::default()),
            text,
            reply_emoji: config.reply_emoji.clone(),
            reply_fallback: config.reply_fallback.clone(),
            event_tx,
        }
    }

    /// Subscribe to poll-changed notifications
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.event_tx.subscribe()
    }

    /// Merge a poll and its snapshot into the cache.
    ///
    /// Returns the cached poll as it stands after the merge. Does not notify
    /// subscribers; [`handle_server_update`](Self::handle_server_update) does.
    pub fn upsert_poll(&self, incoming: IncomingPoll, results: PollResults) -> Poll {
        let mut store = self.store.write();
        self.upsert_locked(&mut store, incoming, results)
    }

    fn upsert_locked(&self, store: &mut PollStore, incoming: IncomingPoll, results: PollResults) -> Poll {
        let id = incoming.id.clone();
        let poll = match store.polls.entry(id.clone()) {
            Entry::Occupied(entry) => {
                let poll = entry.into_mut();
                poll.merge(incoming);
                poll
            }
            Entry::Vacant(entry) => {
                let mut poll = Poll::from(incoming);
                poll.rendered = Some(self.render(&poll.question));
                poll.chosen_indexes.clear();
                debug!(poll_id = %id, answers = poll.answers.len(), "caching new poll");
                entry.insert(poll)
            }
        };

        apply_results(poll, &results);
        let merged = poll.clone();
        store.results.insert(id, results);
        merged
    }

    /// Apply a server-pushed update.
    ///
    /// Returns the merged poll, or `None` if the update was not a poll update
    /// or referenced a poll that is neither cached nor embedded.
    pub fn handle_server_update(&self, update: &ServerUpdate) -> Option<Poll> {
        let ServerUpdate::MessagePoll { poll_id, poll, results } = update else {
            return None;
        };

        let merged = {
            let mut store = self.store.write();
            let incoming = match poll {
                Some(poll) => poll.clone(),
                None if store.polls.contains_key(poll_id) => IncomingPoll::id_only(poll_id.clone()),
                None => {
                    debug!(poll_id = %poll_id, "dropping update for unknown poll");
                    return None;
                }
            };
            self.upsert_locked(&mut store, incoming, results.clone())
        };

        trace!(poll_id = %merged.id, min = results.min, chosen = ?merged.chosen_indexes, "poll updated");
        // No subscribers is fine.
        let _ = self.event_tx.send(PollEvent {
            poll: merged.clone(),
            results: results.clone(),
        });
        Some(merged)
    }

    /// Current cached poll and snapshot
    pub fn lookup(&self, id: &PollId) -> Option<(Poll, PollResults)> {
        let store = self.store.read();
        let poll = store.polls.get(id)?.clone();
        let results = store.results.get(id).cloned().unwrap_or_default();
        Some((poll, results))
    }

    /// Whether a poll is cached
    pub fn contains(&self, id: &PollId) -> bool {
        self.store.read().polls.contains_key(id)
    }

    /// All cached polls with their snapshots, ordered by id
    pub fn entries(&self) -> Vec<(Poll, PollResults)> {
        let store = self.store.read();
        let mut entries: Vec<_> = store
            .polls
            .values()
            .map(|poll| {
                let results = store.results.get(&poll.id).cloned().unwrap_or_default();
                (poll.clone(), results)
            })
            .collect();
        drop(store);

        entries.sort_by(|a, b| a.0.id.cmp(&b.0.id));
        entries
    }

    pub fn len(&self) -> usize {
        self.store.read().polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn render(&self, question: &str) -> RenderedPoll {
        let question = self.text.render(question);
        let label = if question.is_empty() {
            self.text.render(&self.reply_fallback)
        } else {
            question.clone()
        };
        let reply = format!("{} {}", self.text.render(&self.reply_emoji), label);
        RenderedPoll { question, reply }
    }
}

impl UpdateHandler for PollCache {
    fn handle_update(&self, update: &ServerUpdate) {
        self.handle_server_update(update);
    }
}

impl std::fmt::Debug for PollCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollCache")
            .field("polls", &self.len())
            .field("subscribers", &self.event_tx.receiver_count())
            .finish()
    }
}

/// Fold a snapshot into the poll's chosen-answer state.
///
/// Partial snapshots say nothing reliable about the current user's vote and
/// leave `chosen_indexes` alone. Full snapshots rebuild it: answers are
/// matched by option key, and the result is ascending and duplicate-free.
pub fn apply_results(poll: &mut Poll, results: &PollResults) {
    if results.min {
        trace!(poll_id = %poll.id, "partial snapshot, keeping chosen answers");
        return;
    }

    let mut chosen: Vec<usize> = results
        .answers()
        .iter()
        .filter(|voters| voters.chosen)
        .filter_map(|voters| poll.answer_index(&voters.option))
        .collect();
    chosen.sort_unstable();
    chosen.dedup();
    poll.chosen_indexes = chosen;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polls::types::{PollAnswer, PollAnswerVoters};
    use crate::text::MarkdownProcessor;

    fn cache() -> PollCache {
        PollCache::new(Arc::new(MarkdownProcessor::new()), &PollsConfig::default())
    }

    fn incoming(id: &str) -> IncomingPoll {
        IncomingPoll::from(Poll::new(
            id,
            "Best <planet>?",
            vec![
                PollAnswer::new("Mars", "optA"),
                PollAnswer::new("Jupiter", "optB"),
                PollAnswer::new("Saturn", "optC"),
            ],
        ))
    }

    #[test]
    fn test_first_sight_renders_question() {
        let cache = cache();
        let poll = cache.upsert_poll(incoming("p1"), PollResults::default());

        let rendered = poll.rendered.unwrap();
        assert_eq!(rendered.question, "Best &lt;planet&gt;?");
        assert_eq!(rendered.reply, "📊 Best &lt;planet&gt;?");
        assert!(poll.chosen_indexes.is_empty());
    }

    #[test]
    fn test_reply_falls_back_without_question() {
        let cache = cache();
        let poll = cache.upsert_poll(IncomingPoll::id_only(PollId::from("p1")), PollResults::default());
        assert_eq!(poll.rendered.unwrap().reply, "📊 poll");
    }

    #[test]
    fn test_full_snapshot_matches_by_key() {
        let cache = cache();
        // Snapshot order differs from answer order.
        let results = PollResults::full(vec![
            PollAnswerVoters::new("optC", 2).chosen(),
            PollAnswerVoters::new("optA", 1).chosen(),
            PollAnswerVoters::new("optB", 0),
        ]);
        let poll = cache.upsert_poll(incoming("p1"), results);
        assert_eq!(poll.chosen_indexes, vec![0, 2]);
    }

    #[test]
    fn test_unknown_and_duplicate_keys_ignored() {
        let mut poll = Poll::from(incoming("p1"));
        let results = PollResults::full(vec![
            PollAnswerVoters::new("optB", 1).chosen(),
            PollAnswerVoters::new("optB", 1).chosen(),
            PollAnswerVoters::new("gone", 1).chosen(),
        ]);
        apply_results(&mut poll, &results);
        assert_eq!(poll.chosen_indexes, vec![1]);
    }

    #[test]
    fn test_full_snapshot_without_results_clears() {
        let mut poll = Poll::from(incoming("p1"));
        poll.chosen_indexes = vec![1];
        apply_results(&mut poll, &PollResults::default());
        assert!(poll.chosen_indexes.is_empty());
    }

    #[test]
    fn test_results_replaced_unconditionally() {
        let cache = cache();
        cache.upsert_poll(incoming("p1"), PollResults::full(vec![PollAnswerVoters::new("optA", 3)]));
        cache.upsert_poll(
            IncomingPoll::id_only(PollId::from("p1")),
            PollResults::partial(vec![PollAnswerVoters::new("optA", 9)]),
        );

        let (_, results) = cache.lookup(&PollId::from("p1")).unwrap();
        assert!(results.min);
        assert_eq!(results.answers()[0].voters, 9);
    }

    #[test]
    fn test_unsupported_update_ignored() {
        let cache = cache();
        assert!(cache.handle_server_update(&ServerUpdate::Unsupported).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_update_with_embedded_poll_creates_entry() {
        let cache = cache();
        let mut rx = cache.subscribe();
        let update = ServerUpdate::MessagePoll {
            poll_id: PollId::from("p7"),
            poll: Some(incoming("p7")),
            results: PollResults::full(vec![PollAnswerVoters::new("optB", 1).chosen()]),
        };

        let poll = cache.handle_server_update(&update).unwrap();
        assert_eq!(poll.chosen_indexes, vec![1]);
        assert!(cache.contains(&PollId::from("p7")));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.poll, poll);
        assert_eq!(event.results.answers()[0].voters, 1);
    }

    #[test]
    fn test_entries_sorted_by_id() {
        let cache = cache();
        cache.upsert_poll(incoming("b"), PollResults::default());
        cache.upsert_poll(incoming("a"), PollResults::default());

        let ids: Vec<_> = cache.entries().into_iter().map(|(poll, _)| poll.id.0).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(cache.len(), 2);
    }
}
