//! Polls
//!
//! Client-side poll cache, the reconciler that folds server snapshots into
//! it, and the manager for outbound poll operations.

pub mod actions;
pub mod cache;
pub mod manager;
pub mod types;

pub use actions::{build_vote_submission, compute_close_side_effect, input_media_poll, CloseOutcome};
pub use cache::{apply_results, PollCache, PollEvent};
pub use manager::{PollDeps, PollManager};
pub use types::{
    IncomingPoll, OptionKey, Poll, PollAnswer, PollAnswerVoters, PollFlags, PollId, PollResults,
    RenderedPoll,
};
