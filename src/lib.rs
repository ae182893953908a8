//! pollsync library
//!
//! Client-side cache for chat polls. Keeps the latest known poll definitions
//! and result snapshots, reconciles them against server pushes, and tracks
//! which answers the current user picked.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod messages;
pub mod polls;
pub mod text;
pub mod transport;
pub mod updates;

pub use error::{PollError, PollResult};
pub use polls::{PollCache, PollDeps, PollEvent, PollManager};
