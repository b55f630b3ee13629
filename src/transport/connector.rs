//! WebSocket dialing.
//!
//! The event loop never opens sockets itself; it asks a [`Connector`]. The
//! default [`TungsteniteConnector`] dials the rewritten `wss` URL with
//! rustls. Hosts that need a proxy, a custom TLS setup, or an in-process
//! peer provide their own implementation.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Once;

use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async_with_config};
use tracing::{debug, trace};
use url::Url;

use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// WebSocket stream produced by a [`Connector`].
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ============================================================================
// TLS
// ============================================================================

static CRYPTO_PROVIDER: Once = Once::new();

/// Installs the ring provider as the process default for rustls.
///
/// Losing the race to a provider installed by the host is fine.
fn install_crypto_provider() {
    CRYPTO_PROVIDER.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            trace!("rustls crypto provider already installed");
        }
    });
}

// ============================================================================
// Connector
// ============================================================================

/// Opens the WebSocket a session runs over.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Dials `url` and completes the WebSocket handshake.
    ///
    /// # Errors
    ///
    /// Any error rejects the session's `ready` future.
    async fn connect(&self, url: &Url) -> Result<WsStream>;
}

// ============================================================================
// TungsteniteConnector
// ============================================================================

/// Default connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteConnector {
    /// Disable Nagle's algorithm on the TCP socket.
    nodelay: bool,
}

impl TungsteniteConnector {
    /// Creates a connector with Nagle's algorithm enabled.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { nodelay: false }
    }

    /// Sets `TCP_NODELAY` on dialed sockets.
    #[inline]
    #[must_use]
    pub const fn with_nodelay(mut self, nodelay: bool) -> Self {
        self.nodelay = nodelay;
        self
    }
}

#[async_trait]
impl Connector for TungsteniteConnector {
    async fn connect(&self, url: &Url) -> Result<WsStream> {
        debug!(%url, nodelay = self.nodelay, "Dialing WebSocket");
        install_crypto_provider();

        let (ws_stream, response) =
            connect_async_with_config(url.as_str(), None, self.nodelay).await?;

        debug!(status = %response.status(), "WebSocket handshake completed");

        Ok(ws_stream)
    }
}

// ============================================================================
// Tests
// ============================================================================
