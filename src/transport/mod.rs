//! WebSocket transport layer.
//!
//! This module is the single duplex socket every session runs over. It
//! knows nothing about streams or datagrams; it only moves whole messages
//! and reports lifecycle events.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐                         ┌─────────────────┐
//! │  Session             │                         │  Server         │
//! │   Connection (n)     │        WebSocket        │                 │
//! │      │ commands      │◄───────────────────────►│  wss://host     │
//! │   EventLoop (1)      │     binary messages     │                 │
//! │      │ dispatch      │                         │                 │
//! │   MessageHub → readers                         └─────────────────┘
//! └──────────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Connection::new` - Create handle and event loop (state `connecting`)
//! 2. `EventLoop::spawn` - Dial through the [`Connector`]
//! 3. `open` or `error` + `close` - Reported to the lifecycle handler
//! 4. `Connection::close` - Close handshake (state `closing`)
//! 5. `close` - Reported exactly once (state `closed`)
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Connection handle and event loop |
//! | `connector` | WebSocket dialing |
//! | `event` | Ready state and lifecycle events |
//! | `listeners` | Inbound message fan-out |

// ============================================================================
// Submodules
// ============================================================================

/// Connection handle and event loop.
pub mod connection;

/// WebSocket dialing.
pub mod connector;

/// Ready state and lifecycle events.
pub mod event;

/// Inbound message fan-out.
pub(crate) mod listeners;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::Connection;
pub use connector::{Connector, TungsteniteConnector, WsStream};
pub use event::{CloseEvent, LifecycleEvent, LifecycleHandler, ReadyState};
