//! Bidirectional stream.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::transport::Connection;

use super::{ReceiveStream, SendStream};

// ============================================================================
// BidirectionalStream
// ============================================================================

/// A writer and a reader over the session's connection.
///
/// The two halves are independent views: the writer sends whole messages,
/// the reader sees every inbound message on the session. Both are created
/// up front; the reader only starts listening when first polled.
#[derive(Debug)]
pub struct BidirectionalStream {
    writable: SendStream,
    readable: ReceiveStream,
}

impl BidirectionalStream {
    /// Creates a stream whose reader uses the given idle timeout.
    pub(crate) fn new(connection: Connection, idle_timeout: Duration) -> Self {
        Self {
            writable: SendStream::new(connection.clone()),
            readable: ReceiveStream::new(connection, Some(idle_timeout)),
        }
    }

    /// Returns the writable half.
    #[inline]
    #[must_use]
    pub fn writable(&self) -> &SendStream {
        &self.writable
    }

    /// Returns the readable half.
    #[inline]
    pub fn readable(&mut self) -> &mut ReceiveStream {
        &mut self.readable
    }

    /// Splits into owned halves, e.g. to read and write from separate tasks.
    #[inline]
    #[must_use]
    pub fn into_parts(self) -> (SendStream, ReceiveStream) {
        (self.writable, self.readable)
    }
}

// ============================================================================
// Tests
// ============================================================================
