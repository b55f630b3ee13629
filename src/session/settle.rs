//! Settle-once values.
//!
//! A [`Settle`] starts empty, takes its first value, and ignores every
//! later one. Any number of tasks can wait for it and all observe the same
//! value.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::watch;

// ============================================================================
// Settle
// ============================================================================

/// A value that is set at most once and can be awaited.
#[derive(Debug)]
pub(crate) struct Settle<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T: Clone> Settle<T> {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    /// Stores `value` unless already settled. Returns `true` if stored.
    pub(crate) fn settle(&self, value: T) -> bool {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        })
    }

    /// Returns the value if settled.
    pub(crate) fn peek(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    /// Waits until settled.
    ///
    /// `None` only if the sender is gone, which cannot happen while `self`
    /// is alive.
    pub(crate) async fn wait(&self) -> Option<T> {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
