//! Reconciliation tests
//!
//! Exercise the cache through its public surface: upserts, server updates,
//! notifications and the pure vote/close actions.

use pollsync::config::PollsConfig;
use pollsync::polls::{
    build_vote_submission, compute_close_side_effect, CloseOutcome, IncomingPoll, Poll,
    PollAnswer, PollAnswerVoters, PollCache, PollFlags, PollId, PollResults,
};
use pollsync::text::MarkdownProcessor;
use pollsync::updates::ServerUpdate;
use pollsync::PollError;
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;

fn cache() -> PollCache {
    PollCache::new(Arc::new(MarkdownProcessor::new()), &PollsConfig::default())
}

fn two_answer_poll(id: &str) -> Poll {
    Poll::new(
        id,
        "Coffee or tea?",
        vec![PollAnswer::new("Coffee", "optA"), PollAnswer::new("Tea", "optB")],
    )
}

fn update(id: &str, poll: Option<IncomingPoll>, results: PollResults) -> ServerUpdate {
    ServerUpdate::MessagePoll {
        poll_id: PollId::from(id),
        poll,
        results,
    }
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

#[test]
fn test_close_is_idempotent() {
    let closed = two_answer_poll("p1").with_flags(PollFlags {
        closed: true,
        quiz: true,
        ..PollFlags::default()
    });
    assert_eq!(compute_close_side_effect(&closed), CloseOutcome::NoOp);

    let CloseOutcome::Close(now_closed) = compute_close_side_effect(&two_answer_poll("p1")) else {
        panic!("open poll should produce a close edit");
    };
    assert_eq!(compute_close_side_effect(&now_closed), CloseOutcome::NoOp);
}

#[test]
fn test_min_snapshot_preserves_choice() {
    let cache = cache();
    let full = PollResults::full(vec![
        PollAnswerVoters::new("optA", 1),
        PollAnswerVoters::new("optB", 1).chosen(),
    ]);
    cache.upsert_poll(two_answer_poll("p1").into(), full);

    // Partial snapshots may carry stale or garbage chosen flags.
    for results in [
        PollResults::partial(vec![PollAnswerVoters::new("optA", 10).chosen()]),
        PollResults::partial(vec![]),
        PollResults {
            min: true,
            ..PollResults::default()
        },
    ] {
        let poll = cache.upsert_poll(IncomingPoll::id_only(PollId::from("p1")), results);
        assert_eq!(poll.chosen_indexes, vec![1]);
    }
}

#[test]
fn test_full_snapshot_rebuilds_choice() {
    let cache = cache();
    let poll = Poll::new(
        "p1",
        "Pick any",
        vec![
            PollAnswer::new("A", "a"),
            PollAnswer::new("B", "b"),
            PollAnswer::new("C", "c"),
        ],
    );
    cache.upsert_poll(
        poll.into(),
        PollResults::full(vec![PollAnswerVoters::new("a", 1).chosen()]),
    );

    let poll = cache.upsert_poll(
        IncomingPoll::id_only(PollId::from("p1")),
        PollResults::full(vec![
            PollAnswerVoters::new("c", 4).chosen(),
            PollAnswerVoters::new("a", 2),
            PollAnswerVoters::new("b", 3).chosen(),
        ]),
    );
    assert_eq!(poll.chosen_indexes, vec![1, 2]);
}

#[test]
fn test_first_sight_initializes() {
    let cache = cache();
    let mut incoming = two_answer_poll("p1");
    // Whatever the caller claims, a new poll starts with no choice.
    incoming.chosen_indexes = vec![0, 1];

    let poll = cache.upsert_poll(
        IncomingPoll::from(incoming),
        PollResults::partial(vec![PollAnswerVoters::new("optA", 1).chosen()]),
    );
    assert!(poll.chosen_indexes.is_empty());

    let rendered = poll.rendered.expect("presentation fields");
    assert_eq!(rendered.question, "Coffee or tea?");
    assert_eq!(rendered.reply, "📊 Coffee or tea?");
}

#[test]
fn test_merge_is_additive() {
    let cache = cache();
    cache.upsert_poll(
        two_answer_poll("p1").with_close_date(1_800_000_000).into(),
        PollResults::default(),
    );

    let mut incoming = IncomingPoll::id_only(PollId::from("p1"));
    incoming.question = Some("Coffee or tea, final answer?".to_string());
    let poll = cache.upsert_poll(incoming, PollResults::default());

    assert_eq!(poll.question, "Coffee or tea, final answer?");
    assert_eq!(poll.close_date, Some(1_800_000_000));
    assert_eq!(poll.answers.len(), 2);
    // Rendered once, on first sight.
    assert_eq!(poll.rendered.unwrap().question, "Coffee or tea?");
}

#[test]
fn test_unknown_update_is_dropped() {
    let cache = cache();
    cache.upsert_poll(two_answer_poll("p1").into(), PollResults::default());
    let mut rx = cache.subscribe();

    let merged = cache.handle_server_update(&update(
        "ghost",
        None,
        PollResults::full(vec![PollAnswerVoters::new("optA", 1).chosen()]),
    ));

    assert!(merged.is_none());
    assert_eq!(cache.len(), 1);
    assert!(cache.lookup(&PollId::from("ghost")).is_none());
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_vote_then_partial_push() {
    let cache = cache();
    let mut rx = cache.subscribe();

    let poll = cache.upsert_poll(
        two_answer_poll("p1").into(),
        PollResults::full(vec![
            PollAnswerVoters::new("optA", 3).chosen(),
            PollAnswerVoters::new("optB", 1),
        ]),
    );
    assert_eq!(poll.chosen_indexes, vec![0]);

    let merged = cache
        .handle_server_update(&update(
            "p1",
            None,
            PollResults::partial(vec![
                PollAnswerVoters::new("optA", 4),
                PollAnswerVoters::new("optB", 1),
            ]),
        ))
        .expect("cached poll");
    assert_eq!(merged.chosen_indexes, vec![0]);

    let (cached, results) = cache.lookup(&PollId::from("p1")).unwrap();
    assert_eq!(cached, merged);
    assert_eq!(results.answers()[0].voters, 4);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.poll.chosen_indexes, vec![0]);
    assert!(event.results.min);
}

#[test]
fn test_vote_index_out_of_range() {
    let err = build_vote_submission(&two_answer_poll("p1"), &[5]).unwrap_err();
    assert_eq!(err, PollError::IndexOutOfRange { index: 5, answers: 2 });
}

#[test]
fn test_embedded_poll_wins_over_cache() {
    let cache = cache();
    cache.upsert_poll(two_answer_poll("p1").into(), PollResults::default());

    let mut closing = IncomingPoll::id_only(PollId::from("p1"));
    closing.flags = Some(PollFlags {
        closed: true,
        ..PollFlags::default()
    });
    let merged = cache
        .handle_server_update(&update("p1", Some(closing), PollResults::full(vec![])))
        .unwrap();

    assert!(merged.is_closed());
    assert_eq!(merged.question, "Coffee or tea?");
    assert!(merged.chosen_indexes.is_empty());
}

#[test]
fn test_update_decoded_from_json() {
    let raw = r#"{
        "type": "message_poll",
        "poll_id": "p9",
        "poll": {
            "id": "p9",
            "question": "Ship it?",
            "answers": [{"text": "Yes", "option": "eWVz"}, {"text": "No", "option": "bm8="}],
            "flags": {"closed": false, "public_voters": true, "multiple_choice": false, "quiz": false}
        },
        "results": {
            "results": [{"option": "bm8=", "voters": 1, "chosen": true}],
            "total_voters": 1
        }
    }"#;
    let update: ServerUpdate = serde_json::from_str(raw).unwrap();

    let cache = cache();
    let poll = cache.handle_server_update(&update).unwrap();
    assert_eq!(poll.chosen_indexes, vec![1]);
    assert!(poll.flags.public_voters);
}

#[test]
fn test_subscribers_see_every_merge_in_order() {
    let cache = cache();
    let mut rx = cache.subscribe();
    cache.upsert_poll(two_answer_poll("p1").into(), PollResults::default());

    for voters in 1..=3 {
        cache.handle_server_update(&update(
            "p1",
            None,
            PollResults::partial(vec![PollAnswerVoters::new("optA", voters)]),
        ));
    }

    for voters in 1..=3 {
        let event = rx.try_recv().unwrap();
        assert_eq!(event.results.answers()[0].voters, voters);
    }
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}
