//! Pure poll actions: vote submission payloads and the stop-poll edit.

use super::types::{OptionKey, Poll};
use crate::error::{PollError, PollResult};
use crate::text::TextProcessor;
use crate::transport::InputMediaPoll;

/// What stopping a poll requires
#[derive(Debug, Clone, PartialEq)]
pub enum CloseOutcome {
    /// Already closed; nothing to send
    NoOp,
    /// Closed copy to hand to the message editor
    Close(Poll),
}

/// Map selected answer indexes to the option keys sent to the server.
///
/// Fails on the first index with no matching answer, before anything is sent.
/// An empty selection is valid and retracts the vote.
pub fn build_vote_submission(poll: &Poll, indexes: &[usize]) -> PollResult<Vec<OptionKey>> {
    indexes
        .iter()
        .map(|&index| {
            poll.answers
                .get(index)
                .map(|answer| answer.option.clone())
                .ok_or(PollError::IndexOutOfRange {
                    index,
                    answers: poll.answers.len(),
                })
        })
        .collect()
}

/// Decide what closing `poll` takes
pub fn compute_close_side_effect(poll: &Poll) -> CloseOutcome {
    if poll.is_closed() {
        return CloseOutcome::NoOp;
    }
    let mut closed = poll.clone();
    closed.flags.closed = true;
    CloseOutcome::Close(closed)
}

/// Build the media payload for creating or editing a poll message.
///
/// A quiz solution is parsed as markdown into plain text plus entities.
pub fn input_media_poll(
    text: &dyn TextProcessor,
    poll: &Poll,
    correct_answers: Option<Vec<OptionKey>>,
    solution: Option<&str>,
) -> InputMediaPoll {
    let (solution, solution_entities) = match solution {
        Some(raw) => {
            let (plain, entities) = text.parse_markdown(raw);
            (Some(plain), Some(entities))
        }
        None => (None, None),
    };

    let mut poll = poll.clone();
    // Cache-owned fields never go on the wire.
    poll.rendered = None;
    poll.chosen_indexes.clear();

    InputMediaPoll {
        poll,
        correct_answers,
        solution,
        solution_entities,
    }
}
