//! WebSocket connection and event loop.
//!
//! A [`Connection`] is a cheap, cloneable handle to one WebSocket. The
//! socket itself lives in an event loop task which:
//!
//! - Dials through a [`Connector`] and reports `open` or `error`
//! - Fans inbound messages out to the [`MessageHub`]
//! - Writes outbound messages queued by handles
//! - Runs the close handshake and reports `close` exactly once

// ============================================================================
// Imports
// ============================================================================

use std::any::Any;
use std::fmt;
use std::future::pending;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::SplitSink;
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Sleep, sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::{Error, Result};

use super::connector::{Connector, WsStream};
use super::event::{
    CloseEvent, LifecycleEvent, LifecycleHandler, NO_STATUS_RECEIVED, NORMAL_CLOSURE, ReadyState,
};
use super::listeners::MessageHub;

// ============================================================================
// Constants
// ============================================================================

/// Error message when `close` wins the race against the handshake.
const ABORTED_BEFORE_OPEN: &str = "closed before the connection was established";

// ============================================================================
// Types
// ============================================================================

/// Write half of the socket, owned by the event loop.
type WsSink = SplitSink<WsStream, Message>;

/// Timing knobs for the event loop.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopSettings {
    /// Upper bound on dialing, `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    /// How long to wait for the peer to answer a close frame.
    pub close_timeout: Duration,
}

/// Internal commands for the event loop.
#[derive(Debug)]
pub(crate) enum ConnectionCommand {
    /// Write one binary message.
    Send(Bytes),
    /// Start the close handshake.
    Close {
        /// Close code for the frame.
        code: u16,
        /// Close reason for the frame.
        reason: String,
    },
}

/// State shared between handles and the event loop.
struct Shared {
    url: Url,
    state: AtomicU8,
    hub: MessageHub,
}

impl Shared {
    #[inline]
    fn ready_state(&self) -> ReadyState {
        ReadyState::from_u8(self.state.load(Ordering::Acquire))
    }

    #[inline]
    fn set_ready_state(&self, state: ReadyState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

// ============================================================================
// Connection
// ============================================================================

/// Handle to the WebSocket under a session.
///
/// Cloning is cheap; all clones talk to the same event loop. Streams and
/// datagrams hold clones, but only the session decides when to close.
#[derive(Clone)]
pub struct Connection {
    /// State shared with the event loop.
    shared: Arc<Shared>,
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("url", &self.shared.url.as_str())
            .field("state", &self.ready_state())
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Connection {
    /// Creates a handle and the event loop that drives it.
    ///
    /// Nothing happens on the network until [`EventLoop::spawn`] runs.
    pub(crate) fn new(
        url: Url,
        connector: Arc<dyn Connector>,
        settings: LoopSettings,
        handler: LifecycleHandler,
    ) -> (Self, EventLoop) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            url,
            state: AtomicU8::new(ReadyState::Connecting as u8),
            hub: MessageHub::default(),
        });

        let event_loop = EventLoop {
            shared: Arc::clone(&shared),
            command_rx,
            connector,
            settings,
            handler,
        };

        (Self { shared, command_tx }, event_loop)
    }

    /// Returns the URL the socket was dialed with.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.shared.url
    }

    /// Returns the current ready state.
    #[inline]
    #[must_use]
    pub fn ready_state(&self) -> ReadyState {
        self.shared.ready_state()
    }

    /// Returns the number of readers currently tapping the message feed.
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.shared.hub.len()
    }

    /// Queues one binary message.
    ///
    /// Returns as soon as the message is queued; the socket gives no
    /// acknowledgment.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidState`] if the connection is not open
    /// - [`Error::ConnectionClosed`] if the event loop is gone
    pub fn send(&self, payload: Bytes) -> Result<()> {
        let state = self.ready_state();
        if state != ReadyState::Open {
            return Err(Error::invalid_state(state));
        }

        self.command_tx
            .send(ConnectionCommand::Send(payload))
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Requests the close handshake.
    ///
    /// Only a connecting or open connection moves to
    /// [`ReadyState::Closing`]; returns `false` otherwise.
    pub fn close(&self, code: u16, reason: impl Into<String>) -> bool {
        let moved = self
            .shared
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |state| {
                (state <= ReadyState::Open as u8).then_some(ReadyState::Closing as u8)
            })
            .is_ok();

        if !moved {
            trace!(state = %self.ready_state(), "Close ignored");
            return false;
        }

        let reason = reason.into();
        debug!(code, %reason, "Close requested");

        if self
            .command_tx
            .send(ConnectionCommand::Close { code, reason })
            .is_err()
        {
            debug!("Event loop already terminated");
        }

        true
    }

    /// Message listener registry.
    #[inline]
    pub(crate) fn hub(&self) -> &MessageHub {
        &self.shared.hub
    }

    /// Creates a handle with no event loop, for unit tests.
    #[cfg(test)]
    pub(crate) fn detached(
        state: ReadyState,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionCommand>) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            url: Url::parse("wss://example.com/").expect("static url"),
            state: AtomicU8::new(state as u8),
            hub: MessageHub::default(),
        });
        (Self { shared, command_tx }, command_rx)
    }

    /// Forces the ready state, for unit tests.
    #[cfg(test)]
    pub(crate) fn force_ready_state(&self, state: ReadyState) {
        self.shared.set_ready_state(state);
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// The task that owns the socket.
pub(crate) struct EventLoop {
    shared: Arc<Shared>,
    command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
    connector: Arc<dyn Connector>,
    settings: LoopSettings,
    handler: LifecycleHandler,
}

impl EventLoop {
    /// Spawns the event loop on the current tokio runtime.
    ///
    /// A panic inside the loop (including one raised by a [`Connector`]) is
    /// reported as an error followed by an abnormal close.
    pub(crate) fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(self.run()).catch_unwind().await;
            if let Err(panic) = outcome {
                self.recover(panic_message(panic.as_ref()));
            }
        })
    }

    /// Runs the connection from dial to close.
    async fn run(&mut self) {
        let ws_stream = match self.connect().await {
            Ok(ws_stream) => ws_stream,
            Err(message) => {
                self.fail(message);
                return;
            }
        };

        let opened = self
            .shared
            .state
            .compare_exchange(
                ReadyState::Connecting as u8,
                ReadyState::Open as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if !opened {
            let mut ws_stream = ws_stream;
            if let Err(e) = ws_stream.close(None).await {
                trace!(error = %e, "Close of aborted socket failed");
            }
            self.fail(ABORTED_BEFORE_OPEN.to_string());
            return;
        }

        info!(url = %self.shared.url, "WebSocket open");
        self.emit(&LifecycleEvent::Open);

        let event = self.pump(ws_stream).await;
        self.finish(event);
    }

    /// Dials while watching for a close request.
    async fn connect(&mut self) -> std::result::Result<WsStream, String> {
        let dial = dial(
            Arc::clone(&self.connector),
            self.shared.url.clone(),
            self.settings.connect_timeout,
        );
        tokio::pin!(dial);

        loop {
            tokio::select! {
                result = &mut dial => return result.map_err(|e| match e {
                    Error::Connection { message } => message,
                    other => other.to_string(),
                }),

                command = self.command_rx.recv() => match command {
                    Some(ConnectionCommand::Send(payload)) => {
                        warn!(len = payload.len(), "Dropping message queued before open");
                    }

                    Some(ConnectionCommand::Close { code, .. }) => {
                        debug!(code, "Close requested while connecting");
                        return Err(ABORTED_BEFORE_OPEN.to_string());
                    }

                    None => {
                        debug!("All connection handles dropped while connecting");
                        return Err(ABORTED_BEFORE_OPEN.to_string());
                    }
                }
            }
        }
    }

    /// Moves messages until the connection finishes.
    async fn pump(&mut self, ws_stream: WsStream) -> CloseEvent {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut requested: Option<CloseEvent> = None;
        let mut deadline: Option<Pin<Box<Sleep>>> = None;

        let event = loop {
            tokio::select! {
                // Incoming messages from the peer
                message = ws_read.next() => match message {
                    Some(Ok(Message::Binary(data))) => self.deliver(data),

                    Some(Ok(Message::Text(text))) => {
                        self.deliver(Bytes::copy_from_slice(text.as_bytes()));
                    }

                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "Close frame received");
                        break close_event(frame, requested.take());
                    }

                    // Ping, Pong and raw frames are handled by tungstenite
                    Some(Ok(_)) => {}

                    Some(Err(e)) => {
                        error!(error = %e, "WebSocket error");
                        self.emit(&LifecycleEvent::Error { message: e.to_string() });
                        break CloseEvent::abnormal();
                    }

                    None => {
                        debug!("WebSocket stream ended");
                        break requested.take().unwrap_or_else(CloseEvent::abnormal);
                    }
                },

                // Commands from handles
                command = self.command_rx.recv(), if requested.is_none() => match command {
                    Some(ConnectionCommand::Send(payload)) => {
                        let len = payload.len();
                        match ws_write.send(Message::Binary(payload)).await {
                            Ok(()) => trace!(len, "Message sent"),
                            Err(e) => warn!(error = %e, len, "Failed to send message"),
                        }
                    }

                    Some(ConnectionCommand::Close { code, reason }) => {
                        requested = Some(start_close(&mut ws_write, code, reason).await);
                        deadline = Some(Box::pin(sleep(self.settings.close_timeout)));
                    }

                    None => {
                        debug!("All connection handles dropped");
                        self.shared.set_ready_state(ReadyState::Closing);
                        requested = Some(start_close(&mut ws_write, NORMAL_CLOSURE, String::new()).await);
                        deadline = Some(Box::pin(sleep(self.settings.close_timeout)));
                    }
                },

                // Peer never answered our close frame
                () = wait_deadline(&mut deadline) => {
                    warn!(
                        timeout_ms = self.settings.close_timeout.as_millis() as u64,
                        "Close handshake timed out"
                    );
                    break match requested.take() {
                        Some(event) => CloseEvent { was_clean: false, ..event },
                        None => CloseEvent::abnormal(),
                    };
                }
            }
        };

        if let Err(e) = ws_write.close().await {
            trace!(error = %e, "Socket close after shutdown");
        }

        event
    }

    /// Hands an inbound message to every listener.
    fn deliver(&self, payload: Bytes) {
        let len = payload.len();
        let reached = self.shared.hub.dispatch(payload);
        trace!(len, reached, "Message dispatched");
    }

    /// Reports a connection that never opened or broke while opening.
    fn fail(&self, message: String) {
        warn!(url = %self.shared.url, %message, "WebSocket connection failed");

        self.shared.set_ready_state(ReadyState::Closed);
        self.shared.hub.close();

        self.emit(&LifecycleEvent::Error { message });
        self.emit(&LifecycleEvent::Close(CloseEvent::abnormal()));
    }

    /// Settles the lifecycle after the loop panicked.
    fn recover(&self, panic: &str) {
        error!(url = %self.shared.url, panic, "Event loop panicked");

        if self.shared.ready_state() == ReadyState::Closed {
            return;
        }
        self.fail(format!("event loop panicked: {panic}"));
    }

    /// Reports the end of an opened connection.
    fn finish(&self, event: CloseEvent) {
        info!(
            url = %self.shared.url,
            code = event.code,
            reason = %event.reason,
            was_clean = event.was_clean,
            "WebSocket closed"
        );

        self.shared.set_ready_state(ReadyState::Closed);
        self.shared.hub.close();

        self.emit(&LifecycleEvent::Close(event));
        debug!("Event loop terminated");
    }

    #[inline]
    fn emit(&self, event: &LifecycleEvent) {
        trace!(?event, "Lifecycle event");
        (self.handler)(event);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Extracts the message of a panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

/// Dials through the connector, honoring the optional timeout.
async fn dial(
    connector: Arc<dyn Connector>,
    url: Url,
    connect_timeout: Option<Duration>,
) -> Result<WsStream> {
    match connect_timeout {
        Some(limit) => timeout(limit, connector.connect(&url))
            .await
            .map_err(|_| Error::connection_timeout(limit.as_millis() as u64))?,
        None => connector.connect(&url).await,
    }
}

/// Sends a close frame and returns the event to report if the peer does
/// not answer with its own frame.
async fn start_close(ws_write: &mut WsSink, code: u16, reason: String) -> CloseEvent {
    debug!(code, %reason, "Sending close frame");

    let frame = CloseFrame {
        code: CloseCode::from(code),
        reason: reason.clone().into(),
    };

    if let Err(e) = ws_write.send(Message::Close(Some(frame))).await {
        warn!(error = %e, "Failed to send close frame");
    }

    CloseEvent {
        code,
        reason,
        was_clean: true,
    }
}

/// Builds the close event from the peer's close frame.
fn close_event(frame: Option<CloseFrame>, requested: Option<CloseEvent>) -> CloseEvent {
    match frame {
        Some(frame) => CloseEvent {
            code: u16::from(frame.code),
            reason: frame.reason.to_string(),
            was_clean: true,
        },
        None => requested.unwrap_or(CloseEvent {
            code: NO_STATUS_RECEIVED,
            reason: String::new(),
            was_clean: true,
        }),
    }
}

/// Resolves when the close deadline passes; never resolves without one.
async fn wait_deadline(deadline: &mut Option<Pin<Box<Sleep>>>) {
    match deadline {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
