//! The session type.
//!
//! A [`Session`] owns one WebSocket, dialed as soon as the session is
//! created. Every stream and the datagram channel are views over that one
//! socket.
//!
//! # Example
//!
//! ```no_run
//! use webtransport_ws::{CloseInfo, Session};
//!
//! # async fn example() -> webtransport_ws::Result<()> {
//! let session = Session::new("https://relay.example.com/chat")?;
//! session.ready().await?;
//!
//! let mut stream = session.create_bidirectional_stream().await?;
//! stream.writable().write("hello").await?;
//! let reply = stream.readable().read().await;
//! println!("reply: {reply:?}");
//!
//! session.close(Some(CloseInfo::new(4000, "done")));
//! let event = session.closed().await?;
//! println!("closed with {}", event.code);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::runtime::Handle;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::address;
use crate::error::{Error, Result};
use crate::stream::{BidirectionalStream, Datagrams, IncomingStreams, ReceiveStream, SendStream};
use crate::transport::{CloseEvent, Connection, LifecycleEvent, LifecycleHandler, ReadyState};

use super::close::CloseInfo;
use super::lifecycle::Lifecycle;
use super::options::SessionOptions;

// ============================================================================
// Session
// ============================================================================

/// A WebTransport session carried over one WebSocket.
///
/// Dropping the last handle to the connection (the session and any
/// streams) closes the socket with code 1000.
pub struct Session {
    /// Unique identifier used in logs.
    id: Uuid,

    /// Validated `wss` URL.
    url: Url,

    /// Settings the session was created with.
    options: SessionOptions,

    /// Ready/closed state and the connection handle.
    lifecycle: Arc<Lifecycle>,

    /// Datagram channel.
    datagrams: Datagrams,

    /// Server-initiated bidirectional streams (unsupported).
    incoming_bidirectional: IncomingStreams<BidirectionalStream>,

    /// Server-initiated unidirectional streams (unsupported).
    incoming_unidirectional: IncomingStreams<ReceiveStream>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("url", &self.url.as_str())
            .field("state", &self.ready_state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Constructors
// ============================================================================

impl Session {
    /// Creates a session with default options and starts connecting.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// - [`Error::Syntax`] if `url` is not a valid `https` URL without a fragment
    /// - [`Error::Connection`] if no tokio runtime is running
    pub fn new(url: &str) -> Result<Self> {
        Self::with_options(url, SessionOptions::default())
    }

    /// Creates a session with the given options and starts connecting.
    ///
    /// # Errors
    ///
    /// Same as [`Session::new`].
    pub fn with_options(url: &str, options: SessionOptions) -> Result<Self> {
        let url = address::validate(url)?;

        if Handle::try_current().is_err() {
            return Err(Error::connection("a tokio runtime is required to open a session"));
        }

        let id = Uuid::new_v4();
        let lifecycle = Arc::new(Lifecycle::new(id));

        let (connection, event_loop) = Connection::new(
            url.clone(),
            options.connector(),
            options.loop_settings(),
            lifecycle_handler(Arc::downgrade(&lifecycle)),
        );

        lifecycle.attach(connection.clone());
        let datagrams = Datagrams::new(connection);

        event_loop.spawn();
        info!(session = %id, %url, "Session created");

        Ok(Self {
            id,
            url,
            options,
            lifecycle,
            datagrams,
            incoming_bidirectional: IncomingStreams::new(),
            incoming_unidirectional: IncomingStreams::new(),
        })
    }
}

/// Routes connection events into the lifecycle without keeping it alive.
fn lifecycle_handler(lifecycle: Weak<Lifecycle>) -> LifecycleHandler {
    Box::new(move |event: &LifecycleEvent| {
        if let Some(lifecycle) = lifecycle.upgrade() {
            lifecycle.handle(event);
        }
    })
}

// ============================================================================
// Session - Accessors
// ============================================================================

impl Session {
    /// Returns the session's unique identifier.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &Uuid {
        &self.id
    }

    /// Returns the `wss` URL the session connects to.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the options the session was created with.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Returns the state of the underlying socket.
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.lifecycle
            .connection()
            .map_or(ReadyState::Closed, |connection| connection.ready_state())
    }

    /// Returns the datagram channel.
    #[inline]
    #[must_use]
    pub fn datagrams(&self) -> &Datagrams {
        &self.datagrams
    }

    /// Returns the source of server-initiated bidirectional streams.
    #[inline]
    #[must_use]
    pub fn incoming_bidirectional_streams(&self) -> &IncomingStreams<BidirectionalStream> {
        &self.incoming_bidirectional
    }

    /// Returns the source of server-initiated unidirectional streams.
    #[inline]
    #[must_use]
    pub fn incoming_unidirectional_streams(&self) -> &IncomingStreams<ReceiveStream> {
        &self.incoming_unidirectional
    }
}

// ============================================================================
// Session - Lifecycle
// ============================================================================

impl Session {
    /// Waits until the socket is open.
    ///
    /// Settles once; later errors do not change the outcome.
    ///
    /// # Errors
    ///
    /// [`Error::Connection`] with the failure message if the socket errored
    /// or closed before opening.
    pub async fn ready(&self) -> Result<()> {
        match self.lifecycle.ready.wait().await {
            Some(Ok(())) => Ok(()),
            Some(Err(message)) => Err(Error::connection(message)),
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Waits until the socket has closed.
    ///
    /// # Errors
    ///
    /// [`Error::AbnormalClose`] if the close code is between 1000 and 4000,
    /// both exclusive.
    pub async fn closed(&self) -> Result<CloseEvent> {
        match self.lifecycle.closed.wait().await {
            Some(event) if event.is_abnormal() => Err(Error::AbnormalClose(event)),
            Some(event) => Ok(event),
            None => Err(Error::ConnectionClosed),
        }
    }

    /// Starts closing the session.
    ///
    /// Without `info` the socket closes with 1000 and `"Closed by client"`.
    /// Codes a WebSocket cannot carry become 4000. Does nothing if the
    /// session is already closing or closed.
    pub fn close(&self, info: Option<CloseInfo>) {
        let Some(connection) = self.lifecycle.connection() else {
            debug!(session = %self.id, "Close ignored, connection gone");
            return;
        };

        if connection.ready_state() > ReadyState::Open {
            debug!(session = %self.id, state = %connection.ready_state(), "Close ignored");
            return;
        }

        let info = info.unwrap_or_default();
        let code = info.wire_code();
        if u32::from(code) != info.close_code {
            debug!(session = %self.id, requested = info.close_code, code, "Close code coerced");
        }

        info!(session = %self.id, code, reason = %info.wire_reason(), "Closing session");
        connection.close(code, info.wire_reason());
    }
}

// ============================================================================
// Session - Streams
// ============================================================================

impl Session {
    /// Returns the live connection or [`Error::TransportClosed`].
    fn live_connection(&self) -> Result<Connection> {
        self.lifecycle.connection().ok_or(Error::TransportClosed)
    }

    /// Creates a bidirectional stream.
    ///
    /// # Errors
    ///
    /// [`Error::TransportClosed`] once the session has closed.
    pub async fn create_bidirectional_stream(&self) -> Result<BidirectionalStream> {
        let connection = self.live_connection()?;
        debug!(session = %self.id, "Bidirectional stream created");
        Ok(BidirectionalStream::new(
            connection,
            self.options.idle_timeout,
        ))
    }

    /// Creates an outbound unidirectional stream.
    ///
    /// # Errors
    ///
    /// [`Error::TransportClosed`] once the session has closed.
    pub async fn create_unidirectional_stream(&self) -> Result<SendStream> {
        let connection = self.live_connection()?;
        debug!(session = %self.id, "Unidirectional stream created");
        Ok(SendStream::new(connection))
    }

    /// Creates an inbound stream reader with the session's idle policy.
    ///
    /// # Errors
    ///
    /// [`Error::TransportClosed`] once the session has closed.
    pub async fn create_receive_stream(&self) -> Result<ReceiveStream> {
        let connection = self.live_connection()?;
        debug!(session = %self.id, "Receive stream created");
        Ok(ReceiveStream::new(
            connection,
            Some(self.options.idle_timeout),
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::SyntaxError;

    #[test]
    fn test_invalid_url_rejected_without_runtime() {
        let err = Session::new("not a url").expect_err("invalid url");
        assert!(matches!(err, Error::Syntax(SyntaxError::InvalidUrl)));

        let err = Session::new("http://example.com").expect_err("wrong scheme");
        assert!(matches!(err, Error::Syntax(SyntaxError::InvalidProtocol)));

        let err = Session::new("https://example.com/#frag").expect_err("fragment");
        assert!(matches!(err, Error::Syntax(SyntaxError::FragmentNotPermitted)));
    }

    #[test]
    fn test_requires_runtime() {
        let err = Session::new("https://example.com").expect_err("no runtime");
        assert!(err.is_connection_error());
    }

    #[tokio::test]
    async fn test_factories_fail_after_handle_released() {
        let session = Session::new("https://127.0.0.1:9/").expect("session");
        session
            .lifecycle
            .handle(&LifecycleEvent::Close(CloseEvent::abnormal()));

        assert_eq!(session.ready_state(), ReadyState::Closed);
        assert!(matches!(
            session.create_bidirectional_stream().await,
            Err(Error::TransportClosed)
        ));
        assert!(matches!(
            session.create_unidirectional_stream().await,
            Err(Error::TransportClosed)
        ));
        assert!(matches!(
            session.create_receive_stream().await,
            Err(Error::TransportClosed)
        ));
        assert!(matches!(session.closed().await, Err(Error::AbnormalClose(_))));
    }
}
