//! Loopback WebSocket server and connector shared by integration tests.

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use url::Url;

use webtransport_ws::error::{Error, Result};
use webtransport_ws::{Connector, WsStream};

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on waiting for any single server event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Tracing
// ============================================================================

static TRACING: Once = Once::new();

/// Installs a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// Server
// ============================================================================

/// What the server saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// A data message (text frames are converted to bytes).
    Message(Bytes),
    /// A close frame from the client.
    Closed { code: u16, reason: String },
    /// The connection ended.
    Disconnected,
}

/// What the server should do next.
#[derive(Debug)]
enum ServerAction {
    Send(Message),
    Close(u16, String),
}

/// A one-connection WebSocket server on `127.0.0.1`.
pub struct LoopbackServer {
    port: u16,
    actions: mpsc::UnboundedSender<ServerAction>,
    events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl LoopbackServer {
    /// Starts a server that records messages without answering.
    pub async fn start() -> Self {
        Self::spawn(false).await
    }

    /// Starts a server that sends every data message back.
    pub async fn echo() -> Self {
        Self::spawn(true).await
    }

    async fn spawn(echo: bool) -> Self {
        init_tracing();

        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let (actions, mut action_rx) = mpsc::unbounded_channel();
        let (event_tx, events) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                return;
            };

            loop {
                tokio::select! {
                    message = ws.next() => match message {
                        Some(Ok(Message::Binary(data))) => {
                            if echo {
                                let _ = ws.send(Message::Binary(data.clone())).await;
                            }
                            let _ = event_tx.send(ServerEvent::Message(data));
                        }
                        Some(Ok(Message::Text(text))) => {
                            let data = Bytes::copy_from_slice(text.as_bytes());
                            if echo {
                                let _ = ws.send(Message::Binary(data.clone())).await;
                            }
                            let _ = event_tx.send(ServerEvent::Message(data));
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (u16::from(f.code), f.reason.to_string()))
                                .unwrap_or((1005, String::new()));
                            let _ = event_tx.send(ServerEvent::Closed { code, reason });
                        }
                        Some(Ok(_)) => {}
                        Some(Err(_)) | None => {
                            let _ = event_tx.send(ServerEvent::Disconnected);
                            break;
                        }
                    },

                    action = action_rx.recv() => match action {
                        Some(ServerAction::Send(message)) => {
                            let _ = ws.send(message).await;
                        }
                        Some(ServerAction::Close(code, reason)) => {
                            let frame = CloseFrame {
                                code: CloseCode::from(code),
                                reason: reason.into(),
                            };
                            let _ = ws.close(Some(frame)).await;
                        }
                        // Test dropped the server handle; keep serving the socket.
                        None => {
                            while let Some(Ok(_)) = ws.next().await {}
                            break;
                        }
                    },
                }
            }
        });

        Self {
            port,
            actions,
            events,
        }
    }

    /// Returns the bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns a connector that dials this server.
    pub fn connector(&self) -> LoopbackConnector {
        LoopbackConnector::new(self.port)
    }

    /// Sends a binary message to the client.
    pub fn send(&self, payload: impl Into<Bytes>) {
        let _ = self.actions.send(ServerAction::Send(Message::Binary(payload.into())));
    }

    /// Sends a text message to the client.
    pub fn send_text(&self, text: &str) {
        let _ = self.actions.send(ServerAction::Send(Message::Text(text.into())));
    }

    /// Starts a server-initiated close.
    pub fn close(&self, code: u16, reason: &str) {
        let _ = self.actions.send(ServerAction::Close(code, reason.to_string()));
    }

    /// Waits for the next event.
    pub async fn next_event(&mut self) -> ServerEvent {
        timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("server event timed out")
            .expect("server task ended")
    }

    /// Waits for the next data message, skipping nothing.
    pub async fn next_message(&mut self) -> Bytes {
        match self.next_event().await {
            ServerEvent::Message(data) => data,
            other => panic!("expected message, got {other:?}"),
        }
    }
}

// ============================================================================
// Connector
// ============================================================================

/// Dials the loopback server and records the URLs sessions asked for.
#[derive(Debug, Clone)]
pub struct LoopbackConnector {
    port: u16,
    dialed: Arc<Mutex<Vec<Url>>>,
}

impl LoopbackConnector {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            dialed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// URLs passed to [`Connector::connect`], in order.
    pub fn dialed(&self) -> Vec<Url> {
        self.dialed.lock().clone()
    }
}

#[async_trait]
impl Connector for LoopbackConnector {
    async fn connect(&self, url: &Url) -> Result<WsStream> {
        self.dialed.lock().push(url.clone());

        let target = format!("ws://127.0.0.1:{}{}", self.port, url.path());
        let (ws_stream, _) = tokio_tungstenite::connect_async(target)
            .await
            .map_err(|e| Error::connection(format!("loopback dial failed: {e}")))?;
        Ok(ws_stream)
    }
}

// ============================================================================
// Readers
// ============================================================================

/// Polls a reader once so it subscribes to the message feed.
pub async fn listen(reader: &mut webtransport_ws::ReceiveStream) {
    assert!(futures_util::poll!(reader.next()).is_pending());
    assert!(reader.is_listening());
}

/// Reads with a bound so a broken test fails instead of hanging.
pub async fn read(reader: &mut webtransport_ws::ReceiveStream) -> Option<Bytes> {
    timeout(EVENT_TIMEOUT, reader.read())
        .await
        .expect("read timed out")
}
