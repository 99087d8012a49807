//! Callback-to-pull bridge for filesystem change events.
//!
//! The notification backend pushes from its own thread at arbitrary times
//! while the tail loop pulls one event at a time between reads. Events that
//! arrive with no pull outstanding are buffered without bound, and pulls that
//! arrive with nothing buffered park until the next push or `close`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;

struct BridgeState<T> {
    /// Events nobody has asked for yet.
    pushed: VecDeque<T>,
    /// Pulls waiting for an event.
    pulls: VecDeque<oneshot::Sender<Option<T>>>,
    closed: bool,
}

/// A cloneable handle to one unbounded event queue. Producers call
/// [`push`](Self::push) and [`close`](Self::close); the consumer awaits
/// [`next`](Self::next).
pub struct EventBridge<T> {
    state: Arc<Mutex<BridgeState<T>>>,
}

impl<T> Clone for EventBridge<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> fmt::Debug for EventBridge<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("EventBridge")
            .field("buffered", &state.pushed.len())
            .field("waiting", &state.pulls.len())
            .field("closed", &state.closed)
            .finish()
    }
}

impl<T> Default for EventBridge<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBridge<T> {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BridgeState {
                pushed: VecDeque::new(),
                pulls: VecDeque::new(),
                closed: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BridgeState<T>> {
        // Every critical section leaves the queues consistent, so a poisoned
        // lock is still safe to use.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hands `event` to the oldest waiting pull, or buffers it. Ignored once
    /// the bridge is closed.
    pub fn push(&self, event: T) {
        let mut state = self.lock();
        if state.closed {
            return;
        }

        let mut event = event;
        while let Some(pull) = state.pulls.pop_front() {
            match pull.send(Some(event)) {
                Ok(()) => return,
                // That puller gave up; offer the event to the next one.
                Err(returned) => match returned {
                    Some(returned) => event = returned,
                    None => return,
                },
            }
        }
        state.pushed.push_back(event);
    }

    /// Marks the source as finished. Buffered events are still delivered;
    /// after them every pull yields `None`.
    pub fn close(&self) {
        let mut state = self.lock();
        state.closed = true;
        for pull in state.pulls.drain(..) {
            let _ = pull.send(None);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Number of events buffered and not yet pulled.
    pub fn buffered(&self) -> usize {
        self.lock().pushed.len()
    }

    /// Waits for the next event, or `None` once the bridge is closed and
    /// drained.
    pub async fn next(&self) -> Option<T> {
        let rx = {
            let mut state = self.lock();
            if let Some(event) = state.pushed.pop_front() {
                return Some(event);
            }
            if state.closed {
                return None;
            }
            let (tx, rx) = oneshot::channel();
            state.pulls.push_back(tx);
            rx
        };

        rx.await.unwrap_or(None)
    }
}
