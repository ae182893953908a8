//! Pending sends
//!
//! Continuations waiting for a locally queued message to receive its final
//! id. Keyed by the provisional id the message was created with.

use super::MessageId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tokio::sync::oneshot;

/// Settled provisional ids remembered for late waiters
const SETTLED_HISTORY: usize = 1024;

/// Continuation queue keyed by provisional message id
#[derive(Debug, Default)]
pub struct PendingSends {
    inner: Mutex<PendingState>,
}

/// How a provisional send ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Settled {
    Sent(MessageId),
    Aborted,
}

#[derive(Debug, Default)]
struct PendingState {
    /// Waiters per provisional id
    waiters: HashMap<MessageId, Vec<oneshot::Sender<MessageId>>>,
    /// Recently settled ids, so late waiters complete at once
    settled: HashMap<MessageId, Settled>,
    /// Settle order, oldest first; bounds `settled`
    order: VecDeque<MessageId>,
}

impl PendingState {
    fn settle(&mut self, provisional: MessageId, outcome: Settled) {
        if self.settled.insert(provisional, outcome).is_none() {
            self.order.push_back(provisional);
        }
        while self.order.len() > SETTLED_HISTORY {
            if let Some(oldest) = self.order.pop_front() {
                self.settled.remove(&oldest);
            }
        }
    }
}

impl PendingSends {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a continuation for `provisional`.
    ///
    /// The receiver yields the final id, or a `RecvError` if the send is
    /// aborted, including when it was aborted before this call.
    pub fn wait(&self, provisional: MessageId) -> oneshot::Receiver<MessageId> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.inner.lock();
        match state.settled.get(&provisional) {
            Some(Settled::Sent(real)) => {
                let _ = tx.send(*real);
            }
            // Dropping the sender fails the receiver.
            Some(Settled::Aborted) => drop(tx),
            None => state.waiters.entry(provisional).or_default().push(tx),
        }
        rx
    }

    /// Wait for `provisional` to be acknowledged
    pub async fn wait_until_sent(&self, provisional: MessageId) -> Option<MessageId> {
        self.wait(provisional).await.ok()
    }

    /// Record the final id of `provisional` and wake its waiters.
    ///
    /// Returns the number of continuations released.
    pub fn resolve(&self, provisional: MessageId, real: MessageId) -> usize {
        let waiters = {
            let mut state = self.inner.lock();
            state.settle(provisional, Settled::Sent(real));
            state.waiters.remove(&provisional).unwrap_or_default()
        };

        let released = waiters.len();
        for tx in waiters {
            let _ = tx.send(real);
        }
        if released > 0 {
            tracing::debug!(provisional = %provisional, mid = %real, released, "released pending sends");
        }
        released
    }

    /// Abandon `provisional`, dropping its waiters and failing later ones.
    ///
    /// Has no effect on an id that was already resolved.
    pub fn abort(&self, provisional: MessageId) -> usize {
        let mut state = self.inner.lock();
        if matches!(state.settled.get(&provisional), Some(Settled::Sent(_))) {
            return 0;
        }
        state.settle(provisional, Settled::Aborted);
        state.waiters.remove(&provisional).map_or(0, |waiters| waiters.len())
    }

    /// Number of continuations still waiting
    pub fn pending_count(&self) -> usize {
        self.inner.lock().waiters.values().map(Vec::len).sum()
    }
}
