//! Inbound stream reader.
//!
//! A [`ReceiveStream`] taps the session's single message feed. It does not
//! register with the feed until it is first polled, so creating a stream
//! that is never read retains nothing.
//!
//! # Idle policy
//!
//! Stream readers stop listening once `idle_timeout` passes after the most
//! recent message with nothing new arriving. The window starts at the first
//! message and restarts on every message. Messages already queued are still
//! yielded, then the stream ends. Datagram readers have no idle policy and
//! end only with the connection.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::time::{Sleep, sleep_until};
use tracing::{debug, trace};

use crate::transport::Connection;
use crate::transport::listeners::{Delivery, ListenerId};

// ============================================================================
// Types
// ============================================================================

enum ReaderState {
    /// Not yet polled.
    Pending,
    /// Registered with the message feed.
    Listening(Subscription),
    /// Cancelled, idle, or the connection closed.
    Finished,
}

struct Subscription {
    id: ListenerId,
    rx: mpsc::UnboundedReceiver<Delivery>,
    idle_timer: Option<Pin<Box<Sleep>>>,
}

// ============================================================================
// ReceiveStream
// ============================================================================

/// Readable side of a stream, or the datagram reader.
///
/// Yields each inbound WebSocket message as [`Bytes`], in arrival order.
/// Every reader on a session sees every message.
///
/// # Example
///
/// ```ignore
/// use futures_util::StreamExt;
///
/// let mut stream = session.create_bidirectional_stream().await?;
/// stream.writable().write("ping").await?;
/// while let Some(message) = stream.readable().next().await {
///     println!("{} bytes", message.len());
/// }
/// ```
pub struct ReceiveStream {
    connection: Connection,
    idle_timeout: Option<Duration>,
    state: ReaderState,
}

impl fmt::Debug for ReceiveStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state {
            ReaderState::Pending => "pending",
            ReaderState::Listening(_) => "listening",
            ReaderState::Finished => "finished",
        };

        f.debug_struct("ReceiveStream")
            .field("idle_timeout", &self.idle_timeout)
            .field("state", &state)
            .finish_non_exhaustive()
    }
}

impl ReceiveStream {
    /// Creates a reader; `None` disables the idle policy.
    pub(crate) fn new(connection: Connection, idle_timeout: Option<Duration>) -> Self {
        Self {
            connection,
            idle_timeout,
            state: ReaderState::Pending,
        }
    }

    /// Reads the next message, or `None` once the stream has ended.
    pub async fn read(&mut self) -> Option<Bytes> {
        self.next().await
    }

    /// Stops listening and ends the stream.
    ///
    /// Queued messages are discarded. Dropping the reader does the same.
    pub fn cancel(&mut self) {
        if let ReaderState::Listening(subscription) =
            mem::replace(&mut self.state, ReaderState::Finished)
        {
            self.connection.hub().unsubscribe(subscription.id);
            debug!("Receive stream cancelled");
        }
    }

    /// Returns `true` while the reader is registered with the message feed.
    #[inline]
    #[must_use]
    pub fn is_listening(&self) -> bool {
        matches!(self.state, ReaderState::Listening(_))
    }

    /// Returns `true` once the stream has ended.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        matches!(self.state, ReaderState::Finished)
    }

    fn start(&mut self) {
        let (id, rx) = self.connection.hub().subscribe(self.idle_timeout);
        trace!(?id, idle_timeout = ?self.idle_timeout, "Receive stream started");

        self.state = ReaderState::Listening(Subscription {
            id,
            rx,
            idle_timer: None,
        });
    }
}

impl Stream for ReceiveStream {
    type Item = Bytes;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Bytes>> {
        let this = self.get_mut();

        if matches!(this.state, ReaderState::Pending) {
            this.start();
        }

        let ReaderState::Listening(subscription) = &mut this.state else {
            return Poll::Ready(None);
        };

        loop {
            match subscription.rx.poll_recv(cx) {
                Poll::Ready(Some(delivery)) => {
                    // A window too large to represent never lapses.
                    let deadline = this
                        .idle_timeout
                        .and_then(|idle_timeout| delivery.at.checked_add(idle_timeout));
                    if let Some(deadline) = deadline {
                        match subscription.idle_timer.as_mut() {
                            Some(timer) => timer.as_mut().reset(deadline),
                            None => subscription.idle_timer = Some(Box::pin(sleep_until(deadline))),
                        }
                    }
                    return Poll::Ready(Some(delivery.payload));
                }

                Poll::Ready(None) => {
                    this.state = ReaderState::Finished;
                    return Poll::Ready(None);
                }

                Poll::Pending => {
                    let Some(timer) = subscription.idle_timer.as_mut() else {
                        return Poll::Pending;
                    };
                    if timer.as_mut().poll(cx).is_pending() {
                        return Poll::Pending;
                    }

                    debug!(id = ?subscription.id, "Receive stream idle, unsubscribing");
                    this.connection.hub().unsubscribe(subscription.id);
                    subscription.idle_timer = None;
                    // Drain what is already queued, then end.
                    subscription.rx.close();
                }
            }
        }
    }
}

impl Drop for ReceiveStream {
    fn drop(&mut self) {
        if let ReaderState::Listening(subscription) = &self.state {
            self.connection.hub().unsubscribe(subscription.id);
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
