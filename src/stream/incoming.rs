//! Server-initiated streams.
//!
//! A WebSocket peer cannot open a stream on its own; every message belongs
//! to the one socket the client dialed. The incoming stream sources exist
//! so the session surface matches WebTransport, and always refuse.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Error message for every attempt to accept a server-initiated stream.
pub const SERVER_INITIATED_UNSUPPORTED: &str =
    "WebSocket does not support server-initiated streams";

// ============================================================================
// IncomingStreams
// ============================================================================

/// Source of streams opened by the server. Never yields.
///
/// `T` is the stream type a real WebTransport session would produce.
pub struct IncomingStreams<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> IncomingStreams<T> {
    pub(crate) const fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Waits for the next server-initiated stream.
    ///
    /// # Errors
    ///
    /// Always returns [`Error::Unsupported`].
    pub async fn accept(&self) -> Result<T> {
        debug!("Rejected server-initiated stream consumption");
        Err(Error::unsupported(SERVER_INITIATED_UNSUPPORTED))
    }
}

impl<T> fmt::Debug for IncomingStreams<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingStreams").finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
