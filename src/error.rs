//! Error types for the WebTransport adapter.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webtransport_ws::{Result, Session};
//!
//! async fn example() -> Result<()> {
//!     let session = Session::new("https://example.com/chat")?;
//!     session.ready().await?;
//!     let stream = session.create_bidirectional_stream().await?;
//!     stream.writable().write("hello").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Validation | [`Error::Syntax`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Lifecycle | [`Error::TransportClosed`], [`Error::AbnormalClose`] |
//! | Writes | [`Error::InvalidState`] |
//! | Capability | [`Error::Unsupported`] |
//! | External | [`Error::WebSocket`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::transport::{CloseEvent, ReadyState};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// SyntaxError
// ============================================================================

/// Reasons a session URL is rejected at construction.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxError {
    /// The input is not an absolute URL.
    #[error("Invalid URL")]
    InvalidUrl,

    /// The scheme is not `https`.
    #[error("Invalid protocol")]
    InvalidProtocol,

    /// The URL carries a fragment.
    #[error("Fragment is not permitted")]
    FragmentNotPermitted,
}

// ============================================================================
// ErrorSource
// ============================================================================

/// Which part of the transport an error belongs to.
///
/// Mirrors the `source` attribute of a W3C `WebTransportError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSource {
    /// The error concerns a single stream or datagram write.
    Stream,
    /// The error concerns the whole session.
    Session,
}

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Validation Errors
    // ========================================================================
    /// The session URL failed validation.
    ///
    /// Always returned synchronously from session construction.
    #[error("SyntaxError: {0}")]
    Syntax(#[from] SyntaxError),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The WebSocket connection failed.
    ///
    /// Rejects [`Session::ready`](crate::Session::ready) when the socket
    /// errors before opening.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Dialing did not finish within the configured connect timeout.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The connection event loop is gone.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// The session no longer holds a connection.
    ///
    /// Returned by stream factories after the close event.
    #[error("WebTransport is closed")]
    TransportClosed,

    /// The connection closed with a code in the abnormal band.
    ///
    /// Rejects [`Session::closed`](crate::Session::closed) for codes
    /// strictly between 1000 and 4000.
    #[error("Connection closed abnormally: code={}, reason={:?}", .0.code, .0.reason)]
    AbnormalClose(CloseEvent),

    // ========================================================================
    // Write Errors
    // ========================================================================
    /// A message was sent while the connection was not open.
    #[error("Cannot send while connection is {state}")]
    InvalidState {
        /// The connection state at the time of the send.
        state: ReadyState,
    },

    // ========================================================================
    // Capability Errors
    // ========================================================================
    /// The operation cannot be expressed over a WebSocket.
    #[error("Unsupported: {message}")]
    Unsupported {
        /// Description of the missing capability.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates an invalid state error.
    #[inline]
    pub fn invalid_state(state: ReadyState) -> Self {
        Self::InvalidState { state }
    }

    /// Creates an unsupported capability error.
    #[inline]
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a URL validation error.
    #[inline]
    #[must_use]
    pub fn is_syntax_error(&self) -> bool {
        matches!(self, Self::Syntax(_))
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::TransportClosed
                | Self::AbnormalClose(_)
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error may succeed on retry.
    ///
    /// Only transient conditions qualify, and retrying a session means
    /// constructing a new one.
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::ConnectionTimeout { .. } | Self::AbnormalClose(_)
        )
    }

    /// Returns whether this error belongs to a stream or to the session.
    #[must_use]
    pub fn origin(&self) -> ErrorSource {
        match self {
            Self::InvalidState { .. } | Self::Unsupported { .. } => ErrorSource::Stream,
            _ => ErrorSource::Session,
        }
    }

    /// Returns the application stream error code.
    ///
    /// A WebSocket has no per-stream reset codes, so this is always `None`.
    #[inline]
    #[must_use]
    pub fn stream_error_code(&self) -> Option<u32> {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
