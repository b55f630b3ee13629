//! Message listener registry.
//!
//! A WebSocket has one inbound message feed. Every stream and datagram
//! reader on a session taps that same feed by registering a listener here.
//! Each listener owns an unbounded queue, so a slow reader never holds back
//! the others, and messages are handed out in subscription order.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, trace};

// ============================================================================
// Types
// ============================================================================

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ListenerId(u64);

/// One inbound message as seen by a listener.
#[derive(Debug, Clone)]
pub(crate) struct Delivery {
    /// When the event loop dispatched the message.
    pub at: Instant,
    /// Message payload.
    pub payload: Bytes,
}

/// A registered listener.
struct Listener {
    id: ListenerId,
    tx: mpsc::UnboundedSender<Delivery>,
    /// Listener is dropped once this long passes without a message.
    idle_timeout: Option<Duration>,
    /// Time of the last delivery; the idle window starts here.
    last_delivery: Option<Instant>,
}

impl Listener {
    /// Returns `true` if the idle window has lapsed at `now`.
    fn is_idle(&self, now: Instant) -> bool {
        match (self.idle_timeout, self.last_delivery) {
            (Some(timeout), Some(last)) => last
                .checked_add(timeout)
                .is_some_and(|deadline| now >= deadline),
            _ => false,
        }
    }
}

#[derive(Default)]
struct HubState {
    next_id: u64,
    listeners: Vec<Listener>,
    closed: bool,
}

// ============================================================================
// MessageHub
// ============================================================================

/// Fan-out of inbound messages to registered listeners.
#[derive(Default)]
pub(crate) struct MessageHub {
    state: Mutex<HubState>,
}

impl MessageHub {
    /// Registers a listener.
    ///
    /// After [`MessageHub::close`] the returned receiver is already
    /// finished.
    pub(crate) fn subscribe(
        &self,
        idle_timeout: Option<Duration>,
    ) -> (ListenerId, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock();

        let id = ListenerId(state.next_id);
        state.next_id += 1;

        if state.closed {
            trace!(?id, "Subscribe after close");
            return (id, rx);
        }

        state.listeners.push(Listener {
            id,
            tx,
            idle_timeout,
            last_delivery: None,
        });
        trace!(?id, listeners = state.listeners.len(), "Listener subscribed");

        (id, rx)
    }

    /// Removes a listener. Unknown ids are ignored.
    pub(crate) fn unsubscribe(&self, id: ListenerId) {
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|listener| listener.id != id);

        if state.listeners.len() != before {
            trace!(?id, listeners = state.listeners.len(), "Listener unsubscribed");
        }
    }

    /// Delivers a message to every live listener, in subscription order.
    ///
    /// Listeners whose idle window lapsed or whose reader is gone are
    /// removed instead. Returns the number of listeners reached.
    pub(crate) fn dispatch(&self, payload: Bytes) -> usize {
        let now = Instant::now();
        let mut state = self.state.lock();
        let mut delivered = 0;

        state.listeners.retain_mut(|listener| {
            if listener.is_idle(now) {
                debug!(id = ?listener.id, "Idle listener unsubscribed");
                return false;
            }

            let delivery = Delivery {
                at: now,
                payload: payload.clone(),
            };

            if listener.tx.send(delivery).is_err() {
                return false;
            }

            listener.last_delivery = Some(now);
            delivered += 1;
            true
        });

        delivered
    }

    /// Drops every listener and refuses new ones.
    ///
    /// Readers see the end of their stream once their queue drains.
    pub(crate) fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;

        let count = state.listeners.len();
        state.listeners.clear();

        if count > 0 {
            debug!(count, "Listeners released on close");
        }
    }

    /// Returns the number of registered listeners.
    pub(crate) fn len(&self) -> usize {
        self.state.lock().listeners.len()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(text: &'static str) -> Bytes {
        Bytes::from_static(text.as_bytes())
    }

    #[tokio::test]
    async fn test_dispatch_in_order_to_all() {
        let hub = MessageHub::default();
        let (_, mut first) = hub.subscribe(None);
        let (_, mut second) = hub.subscribe(Some(Duration::from_secs(1)));

        assert_eq!(hub.dispatch(payload("a")), 2);
        assert_eq!(hub.dispatch(payload("b")), 2);

        for rx in [&mut first, &mut second] {
            assert_eq!(rx.recv().await.expect("a").payload, payload("a"));
            assert_eq!(rx.recv().await.expect("b").payload, payload("b"));
        }
    }

    #[tokio::test]
    async fn test_unsubscribe() {
        let hub = MessageHub::default();
        let (id, mut rx) = hub.subscribe(None);
        assert_eq!(hub.len(), 1);

        hub.unsubscribe(id);
        assert_eq!(hub.len(), 0);
        assert_eq!(hub.dispatch(payload("x")), 0);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_receiver_pruned() {
        let hub = MessageHub::default();
        let (_, rx) = hub.subscribe(None);
        drop(rx);

        assert_eq!(hub.dispatch(payload("x")), 0);
        assert_eq!(hub.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_listener_removed_on_dispatch() {
        let hub = MessageHub::default();
        let (_, mut idle) = hub.subscribe(Some(Duration::from_secs(1)));
        let (_, mut forever) = hub.subscribe(None);

        hub.dispatch(payload("first"));
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(hub.dispatch(payload("second")), 1);

        assert_eq!(idle.recv().await.expect("first").payload, payload("first"));
        assert!(idle.recv().await.is_none());

        assert_eq!(forever.recv().await.expect("first").payload, payload("first"));
        assert_eq!(forever.recv().await.expect("second").payload, payload("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_window_starts_at_first_message() {
        let hub = MessageHub::default();
        let (_, mut rx) = hub.subscribe(Some(Duration::from_secs(1)));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(hub.dispatch(payload("late")), 1);
        assert_eq!(rx.recv().await.expect("late").payload, payload("late"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_idle_window_never_lapses() {
        let hub = MessageHub::default();
        let (_, mut rx) = hub.subscribe(Some(Duration::MAX));

        assert_eq!(hub.dispatch(payload("first")), 1);
        tokio::time::advance(Duration::from_secs(3600)).await;
        assert_eq!(hub.dispatch(payload("second")), 1);

        assert_eq!(rx.recv().await.expect("first").payload, payload("first"));
        assert_eq!(rx.recv().await.expect("second").payload, payload("second"));
    }

    #[tokio::test]
    async fn test_close_releases_and_refuses() {
        let hub = MessageHub::default();
        let (_, mut before) = hub.subscribe(None);

        hub.close();
        assert!(before.recv().await.is_none());

        let (_, mut after) = hub.subscribe(None);
        assert_eq!(hub.len(), 0);
        assert!(after.recv().await.is_none());
    }
}
