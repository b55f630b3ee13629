//! Stream and datagram views over the session's connection.
//!
//! None of these types own anything on the wire. They are views that write
//! whole messages into the one WebSocket and read from its one inbound feed.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SendStream`] | Writer; errors when the connection is not open |
//! | [`ReceiveStream`] | Lazily-started reader with optional idle policy |
//! | [`BidirectionalStream`] | A writer and a reader |
//! | [`Datagrams`] | Writer that drops when not open, reader without idle policy |
//! | [`IncomingStreams`] | Server-initiated streams, always unsupported |

// ============================================================================
// Submodules
// ============================================================================

/// Bidirectional stream.
pub mod bidirectional;

/// Datagram channel.
pub mod datagrams;

/// Server-initiated stream sources.
pub mod incoming;

/// Inbound stream reader.
pub mod receive;

/// Outbound stream writer.
pub mod send;

// ============================================================================
// Re-exports
// ============================================================================

pub use bidirectional::BidirectionalStream;
pub use datagrams::{DatagramWriter, Datagrams};
pub use incoming::IncomingStreams;
pub use receive::ReceiveStream;
pub use send::SendStream;
