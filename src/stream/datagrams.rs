//! Datagram channel.
//!
//! Datagrams ride the same ordered, reliable WebSocket as streams. They
//! differ from streams in two ways:
//!
//! - Writes made while the connection is not open are dropped silently
//! - Readers never unsubscribe on idle; they end with the connection

// ============================================================================
// Imports
// ============================================================================

use bytes::Bytes;
use tracing::debug;

use crate::error::Result;
use crate::transport::{Connection, ReadyState};

use super::ReceiveStream;

// ============================================================================
// DatagramWriter
// ============================================================================

/// Writable side of the datagram channel.
#[derive(Debug, Clone)]
pub struct DatagramWriter {
    connection: Connection,
}

impl DatagramWriter {
    /// Sends one datagram, or drops it if the connection is not open.
    ///
    /// # Errors
    ///
    /// Only when the connection is open but the send still fails, e.g.
    /// because it closed between the check and the send.
    pub async fn write(&self, chunk: impl Into<Bytes>) -> Result<()> {
        let state = self.connection.ready_state();
        if state != ReadyState::Open {
            debug!(%state, "Datagram dropped, connection not open");
            return Ok(());
        }

        self.connection.send(chunk.into())
    }

    /// Does nothing; the session owns the connection.
    pub async fn close(&self) -> Result<()> {
        Ok(())
    }

    /// Does nothing; the session owns the connection.
    pub async fn abort(&self, _reason: &str) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Datagrams
// ============================================================================

/// The session's datagram channel.
///
/// # Example
///
/// ```ignore
/// use futures_util::StreamExt;
///
/// let datagrams = session.datagrams();
/// let mut reader = datagrams.readable();
/// datagrams.writable().write(vec![0u8; 16]).await?;
/// let reply = reader.next().await;
/// ```
#[derive(Debug)]
pub struct Datagrams {
    connection: Connection,
    writable: DatagramWriter,
}

impl Datagrams {
    /// Creates the channel over the session's connection.
    pub(crate) fn new(connection: Connection) -> Self {
        Self {
            writable: DatagramWriter {
                connection: connection.clone(),
            },
            connection,
        }
    }

    /// Returns the datagram writer.
    #[inline]
    #[must_use]
    pub fn writable(&self) -> &DatagramWriter {
        &self.writable
    }

    /// Returns a new datagram reader.
    ///
    /// Each reader is independent and sees every message that arrives
    /// after it is first polled.
    #[must_use]
    pub fn readable(&self) -> ReceiveStream {
        ReceiveStream::new(self.connection.clone(), None)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tokio_test::{assert_ok, assert_pending, assert_ready_eq, task};

    use crate::transport::connection::ConnectionCommand;

    #[tokio::test]
    async fn test_write_dropped_when_not_open() {
        for state in [ReadyState::Connecting, ReadyState::Closing, ReadyState::Closed] {
            let (connection, mut commands) = Connection::detached(state);
            let datagrams = Datagrams::new(connection);

            assert_ok!(datagrams.writable().write("lost").await);
            assert!(commands.try_recv().is_err(), "nothing sent while {state}");
        }
    }

    #[tokio::test]
    async fn test_write_sent_when_open() {
        let (connection, mut commands) = Connection::detached(ReadyState::Open);
        let datagrams = Datagrams::new(connection);

        assert_ok!(datagrams.writable().write("hello").await);
        assert!(matches!(
            commands.try_recv(),
            Ok(ConnectionCommand::Send(payload)) if payload == Bytes::from_static(b"hello")
        ));
    }

    #[tokio::test]
    async fn test_write_after_reopen_check() {
        let (connection, mut commands) = Connection::detached(ReadyState::Connecting);
        let datagrams = Datagrams::new(connection.clone());

        assert_ok!(datagrams.writable().write("early").await);
        connection.force_ready_state(ReadyState::Open);
        assert_ok!(datagrams.writable().write("on time").await);

        assert!(matches!(
            commands.try_recv(),
            Ok(ConnectionCommand::Send(payload)) if payload == Bytes::from_static(b"on time")
        ));
        assert!(commands.try_recv().is_err());
    }

    #[test]
    fn test_readers_are_independent() {
        let (connection, _commands) = Connection::detached(ReadyState::Open);
        let datagrams = Datagrams::new(connection.clone());

        let mut first = task::spawn(datagrams.readable());
        let mut second = task::spawn(datagrams.readable());
        assert_pending!(first.poll_next());
        assert_pending!(second.poll_next());
        assert_eq!(connection.listener_count(), 2);

        connection.hub().dispatch(Bytes::from_static(b"x"));
        assert_ready_eq!(first.poll_next(), Some(Bytes::from_static(b"x")));
        assert_ready_eq!(second.poll_next(), Some(Bytes::from_static(b"x")));
    }
}
