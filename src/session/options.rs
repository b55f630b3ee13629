//! Session configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use webtransport_ws::SessionOptions;
//!
//! let options = SessionOptions::new()
//!     .with_idle_timeout(Duration::from_secs(5))
//!     .with_connect_timeout(Duration::from_secs(10))
//!     .with_nodelay();
//! assert_eq!(options.idle_timeout, Duration::from_secs(5));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::transport::connection::LoopSettings;
use crate::transport::{Connector, TungsteniteConnector};

// ============================================================================
// Constants
// ============================================================================

/// Idle time after the last message before a stream reader stops listening.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(1);

/// Time allowed for the peer to answer a close frame.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// SessionOptions
// ============================================================================

/// Session configuration options.
#[derive(Clone)]
pub struct SessionOptions {
    /// Idle policy for stream readers. Datagram readers ignore it.
    pub idle_timeout: Duration,

    /// Upper bound on dialing. `None` lets `ready` wait indefinitely.
    pub connect_timeout: Option<Duration>,

    /// Time allowed for the close handshake before the socket is dropped.
    pub close_timeout: Duration,

    /// Dials the WebSocket.
    connector: Arc<dyn Connector>,
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions")
            .field("idle_timeout", &self.idle_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("close_timeout", &self.close_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl SessionOptions {
    /// Creates options with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            connect_timeout: None,
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
            connector: Arc::new(TungsteniteConnector::new()),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl SessionOptions {
    /// Sets the idle policy for stream readers.
    #[inline]
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Bounds the time spent dialing.
    #[inline]
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the time allowed for the close handshake.
    #[inline]
    #[must_use]
    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    /// Uses the default connector with `TCP_NODELAY` set.
    #[inline]
    #[must_use]
    pub fn with_nodelay(mut self) -> Self {
        self.connector = Arc::new(TungsteniteConnector::new().with_nodelay(true));
        self
    }

    /// Replaces the connector used to dial the WebSocket.
    #[inline]
    #[must_use]
    pub fn with_connector(mut self, connector: impl Connector) -> Self {
        self.connector = Arc::new(connector);
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl SessionOptions {
    pub(crate) fn connector(&self) -> Arc<dyn Connector> {
        Arc::clone(&self.connector)
    }

    pub(crate) fn loop_settings(&self) -> LoopSettings {
        LoopSettings {
            connect_timeout: self.connect_timeout,
            close_timeout: self.close_timeout,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
