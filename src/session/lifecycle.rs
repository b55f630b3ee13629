//! Session lifecycle wiring.
//!
//! Translates connection lifecycle events into the session's `ready` and
//! `closed` outcomes and owns the session's connection handle.
//!
//! ```text
//!             open                      close
//! Connecting ─────► Open ──────────────────────► Closed
//!     │               │ error                      ▲
//!     │ error         ▼                            │ close
//!     └──────────► Errored ────────────────────────┘
//! ```
//!
//! `ready` settles on the first of `open` / `error`; `closed` settles on
//! `close`, which also releases the connection handle.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::transport::{CloseEvent, Connection, LifecycleEvent};

use super::settle::Settle;

// ============================================================================
// Types
// ============================================================================

/// Outcome of the `ready` future; the error carries the failure message.
pub(crate) type ReadyOutcome = std::result::Result<(), String>;

// ============================================================================
// Lifecycle
// ============================================================================

/// Lifecycle state shared between a session and its event loop.
pub(crate) struct Lifecycle {
    session_id: Uuid,
    /// Exclusively owned handle; `None` once the connection closed.
    connection: RwLock<Option<Connection>>,
    pub(crate) ready: Settle<ReadyOutcome>,
    pub(crate) closed: Settle<CloseEvent>,
}

impl Lifecycle {
    pub(crate) fn new(session_id: Uuid) -> Self {
        Self {
            session_id,
            connection: RwLock::new(None),
            ready: Settle::new(),
            closed: Settle::new(),
        }
    }

    /// Stores the connection handle.
    ///
    /// Called once, before the event loop starts.
    pub(crate) fn attach(&self, connection: Connection) {
        *self.connection.write() = Some(connection);
    }

    /// Returns a clone of the handle if the connection is still live.
    pub(crate) fn connection(&self) -> Option<Connection> {
        self.connection.read().clone()
    }

    /// Applies one lifecycle event.
    pub(crate) fn handle(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Open => {
                if self.ready.settle(Ok(())) {
                    debug!(session = %self.session_id, "Session ready");
                }
            }

            LifecycleEvent::Error { message } => {
                if self.ready.settle(Err(message.clone())) {
                    warn!(session = %self.session_id, %message, "Session failed before ready");
                } else {
                    debug!(session = %self.session_id, %message, "Connection error after ready");
                }
            }

            LifecycleEvent::Close(close) => {
                self.connection.write().take();
                self.ready
                    .settle(Err(format!("closed with code {} before ready", close.code)));

                if self.closed.settle(close.clone()) {
                    debug!(
                        session = %self.session_id,
                        code = close.code,
                        abnormal = close.is_abnormal(),
                        "Session closed"
                    );
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::transport::ReadyState;

    fn lifecycle() -> Lifecycle {
        let lifecycle = Lifecycle::new(Uuid::new_v4());
        let (connection, _commands) = Connection::detached(ReadyState::Connecting);
        lifecycle.attach(connection);
        lifecycle
    }

    fn close(code: u16) -> CloseEvent {
        CloseEvent {
            code,
            reason: String::new(),
            was_clean: true,
        }
    }

    #[test]
    fn test_open_then_error_keeps_ready() {
        let lifecycle = lifecycle();

        lifecycle.handle(&LifecycleEvent::Open);
        lifecycle.handle(&LifecycleEvent::Error {
            message: "boom".into(),
        });

        assert_eq!(lifecycle.ready.peek(), Some(Ok(())));
    }

    #[test]
    fn test_error_then_open_keeps_failure() {
        let lifecycle = lifecycle();

        lifecycle.handle(&LifecycleEvent::Error {
            message: "refused".into(),
        });
        lifecycle.handle(&LifecycleEvent::Open);

        assert_eq!(lifecycle.ready.peek(), Some(Err("refused".to_string())));
    }

    #[test]
    fn test_close_releases_handle() {
        let lifecycle = lifecycle();
        assert!(lifecycle.connection().is_some());

        lifecycle.handle(&LifecycleEvent::Open);
        lifecycle.handle(&LifecycleEvent::Close(close(1000)));

        assert!(lifecycle.connection().is_none());
        assert_eq!(lifecycle.closed.peek(), Some(close(1000)));
        assert_eq!(lifecycle.ready.peek(), Some(Ok(())));
    }

    #[test]
    fn test_close_settles_once() {
        let lifecycle = lifecycle();

        lifecycle.handle(&LifecycleEvent::Close(close(4001)));
        lifecycle.handle(&LifecycleEvent::Close(close(1001)));

        assert_eq!(lifecycle.closed.peek(), Some(close(4001)));
    }

    #[test]
    fn test_close_before_open_rejects_ready() {
        let lifecycle = lifecycle();
        lifecycle.handle(&LifecycleEvent::Close(close(1006)));

        assert!(matches!(lifecycle.ready.peek(), Some(Err(_))));
    }
}
