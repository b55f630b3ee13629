//! WebTransport over WebSocket.
//!
//! This library provides the WebTransport session API for environments
//! without native WebTransport, carrying every stream and datagram over a
//! single WebSocket.
//!
//! # Architecture
//!
//! - **Session**: validates an `https` URL, dials the `wss` equivalent,
//!   exposes `ready` / `closed` and the stream factories
//! - **Streams**: views over the socket. Writers send whole binary
//!   messages; readers subscribe to the inbound feed when first polled
//! - **Transport**: one event loop task owns the socket and fans every
//!   inbound message out to all active readers in subscription order
//!
//! There is no stream multiplexing: every reader sees every inbound
//! message. Stream readers stop listening after an idle period; datagram
//! readers never do.
//!
//! # Quick Start
//!
//! ```no_run
//! use webtransport_ws::{Result, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = Session::new("https://relay.example.com/echo")?;
//!     session.ready().await?;
//!
//!     let mut stream = session.create_bidirectional_stream().await?;
//!     stream.writable().write("ping").await?;
//!
//!     while let Some(message) = stream.readable().read().await {
//!         println!("received {} bytes", message.len());
//!     }
//!
//!     session.close(None);
//!     session.closed().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`address`] | URL validation and scheme rewrite |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`registry`] | Capability registration |
//! | [`session`] | [`Session`], [`SessionOptions`], [`CloseInfo`] |
//! | [`stream`] | Stream and datagram views |
//! | [`transport`] | WebSocket connection and event loop |

// ============================================================================
// Modules
// ============================================================================

/// URL validation.
///
/// Accepts `https` URLs without fragments and rewrites them to `wss`.
pub mod address;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Capability registration.
pub mod registry;

/// Session type and configuration.
pub mod session;

/// Stream and datagram views.
pub mod stream;

/// WebSocket transport layer.
///
/// Owns the socket, the event loop, and inbound message fan-out.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Session types
pub use session::{CloseInfo, Session, SessionOptions};

// Stream types
pub use stream::{
    BidirectionalStream, DatagramWriter, Datagrams, IncomingStreams, ReceiveStream, SendStream,
};

// Transport types
pub use transport::{CloseEvent, Connector, ReadyState, TungsteniteConnector, WsStream};

// Error types
pub use error::{Error, ErrorSource, Result, SyntaxError};
