//! Server Updates
//!
//! Server-pushed notifications and the dispatcher that delivers them to
//! registered handlers.

use crate::polls::{IncomingPoll, PollId, PollResults};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A server-pushed update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerUpdate {
    /// Someone (possibly us) voted, or a poll's results otherwise changed
    MessagePoll {
        poll_id: PollId,
        /// Full or partial poll object, when the server includes one
        #[serde(default, skip_serializing_if = "Option::is_none")]
        poll: Option<IncomingPoll>,
        results: PollResults,
    },
    /// Any update kind this crate does not consume
    #[serde(other)]
    Unsupported,
}

/// Batch of updates, as returned by RPC calls
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Updates {
    #[serde(default)]
    pub updates: Vec<ServerUpdate>,
}

impl Updates {
    pub fn new(updates: Vec<ServerUpdate>) -> Self {
        Self { updates }
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

impl From<ServerUpdate> for Updates {
    fn from(update: ServerUpdate) -> Self {
        Self::new(vec![update])
    }
}

/// Receives updates from a dispatcher
pub trait UpdateHandler: Send + Sync {
    fn handle_update(&self, update: &ServerUpdate);
}

/// Apply-server-update sink.
///
/// Implementations must deliver updates one at a time and in order; handlers
/// rely on never observing two updates interleaved.
pub trait UpdateDispatcher: Send + Sync {
    /// Register a handler for every subsequent update
    fn register(&self, handler: Arc<dyn UpdateHandler>);

    /// Apply a batch of updates
    fn process_updates(&self, updates: Updates);
}

/// In-process dispatcher that runs every handler synchronously
#[derive(Default)]
pub struct LocalDispatcher {
    handlers: RwLock<Vec<Arc<dyn UpdateHandler>>>,
}

impl LocalDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl UpdateDispatcher for LocalDispatcher {
    fn register(&self, handler: Arc<dyn UpdateHandler>) {
        self.handlers.write().push(handler);
    }

    fn process_updates(&self, updates: Updates) {
        // Snapshot so handlers may register others without deadlocking.
        let handlers: Vec<_> = self.handlers.read().iter().cloned().collect();
        for update in &updates.updates {
            for handler in &handlers {
                handler.handle_update(update);
            }
        }
    }
}
