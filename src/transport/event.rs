//! Connection state and lifecycle events.
//!
//! These are the observable surface of the WebSocket underneath a session:
//! a ready state and the `open` / `error` / `close` notifications.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Close code for a normal closure.
pub const NORMAL_CLOSURE: u16 = 1000;

/// Close code reported when the close frame carried no status.
pub const NO_STATUS_RECEIVED: u16 = 1005;

/// Close code reported when the socket dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// First code of the private-use band, treated as a normal completion.
pub const PRIVATE_USE_START: u16 = 4000;

// ============================================================================
// ReadyState
// ============================================================================

/// Readiness of the underlying connection.
///
/// Ordered so that `state <= ReadyState::Open` means "not yet closing".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ReadyState {
    /// Dialing or handshaking.
    Connecting = 0,
    /// Messages can be sent.
    Open = 1,
    /// A close was requested locally; waiting for the handshake to finish.
    Closing = 2,
    /// The connection is gone.
    Closed = 3,
}

impl ReadyState {
    /// Decodes the value stored in an atomic.
    #[inline]
    #[must_use]
    pub(crate) const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    /// Returns the lowercase state name.
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ReadyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CloseEvent
// ============================================================================

/// Details of a finished connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseEvent {
    /// Close code reported by the peer or synthesized locally.
    pub code: u16,
    /// Close reason, possibly empty.
    pub reason: String,
    /// Whether the close handshake completed.
    pub was_clean: bool,
}

impl CloseEvent {
    /// Close event for a socket that failed or dropped without a handshake.
    #[must_use]
    pub fn abnormal() -> Self {
        Self {
            code: ABNORMAL_CLOSURE,
            reason: String::new(),
            was_clean: false,
        }
    }

    /// Returns `true` if the code lies strictly between 1000 and 4000.
    ///
    /// Normal closure and private-use codes read as a completed session;
    /// protocol and library codes read as a failure.
    #[inline]
    #[must_use]
    pub fn is_abnormal(&self) -> bool {
        self.code > NORMAL_CLOSURE && self.code < PRIVATE_USE_START
    }
}

// ============================================================================
// LifecycleEvent
// ============================================================================

/// Lifecycle notification from the connection event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The WebSocket handshake completed.
    Open,
    /// The connection failed. Always followed by [`LifecycleEvent::Close`].
    Error {
        /// Description of the failure.
        message: String,
    },
    /// The connection is finished. Emitted exactly once.
    Close(CloseEvent),
}

/// Lifecycle handler callback type.
///
/// Called from the event loop task for each lifecycle event, in order.
pub type LifecycleHandler = Box<dyn Fn(&LifecycleEvent) + Send + Sync>;

// ============================================================================
// Tests
// ============================================================================
