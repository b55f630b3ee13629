//! Session management.
//!
//! A [`Session`] is created from an `https` URL, connects immediately, and
//! exposes `ready` / `closed` futures plus stream and datagram factories.

// ============================================================================
// Submodules
// ============================================================================

/// Close parameters and code coercion.
pub mod close;

/// Session type.
pub mod core;

/// Session configuration.
pub mod options;

mod lifecycle;
mod settle;

// ============================================================================
// Re-exports
// ============================================================================

pub use close::CloseInfo;
pub use core::Session;
pub use options::SessionOptions;
