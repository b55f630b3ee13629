//! Outbound stream writer.

// ============================================================================
// Imports
// ============================================================================

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Sink;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::transport::Connection;

// ============================================================================
// SendStream
// ============================================================================

/// Writable side of a stream.
///
/// Every chunk becomes one binary WebSocket message. Writes complete once
/// the message is queued; the socket gives no acknowledgment.
///
/// Closing or aborting the writer does nothing: the socket belongs to the
/// session, so use [`Session::close`](crate::Session::close) to end it.
///
/// # Example
///
/// ```ignore
/// let writer = session.create_unidirectional_stream().await?;
/// writer.write("hello").await?;
/// writer.write(vec![1, 2, 3]).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SendStream {
    connection: Connection,
}

impl SendStream {
    /// Creates a writer over the session's connection.
    pub(crate) fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Writes one chunk.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the connection is not open
    /// - [`Error::ConnectionClosed`] if the connection is gone
    pub async fn write(&self, chunk: impl Into<Bytes>) -> Result<()> {
        self.write_now(chunk.into())
    }

    /// Does nothing; the session owns the connection.
    pub async fn close(&self) -> Result<()> {
        trace!("SendStream close is a no-op");
        Ok(())
    }

    /// Does nothing; the session owns the connection.
    pub async fn abort(&self, reason: &str) -> Result<()> {
        trace!(reason, "SendStream abort is a no-op");
        Ok(())
    }

    fn write_now(&self, chunk: Bytes) -> Result<()> {
        let len = chunk.len();
        self.connection.send(chunk).inspect_err(|e| {
            debug!(error = %e, len, "Stream write rejected");
        })
    }
}

// ============================================================================
// Sink
// ============================================================================

impl Sink<Bytes> for SendStream {
    type Error = Error;

    fn poll_ready(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn start_send(self: Pin<&mut Self>, item: Bytes) -> Result<()> {
        self.write_now(item)
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Result<()>> {
        Poll::Ready(Ok(()))
    }
}

// ============================================================================
// Tests
// ============================================================================
