//! Capability registration.
//!
//! Hosts that expose a `WebTransport` constructor by name (a scripting
//! bridge, a plugin table) can install this crate's [`Session`] as the
//! fallback when they do not already provide one.
//!
//! ```
//! use webtransport_ws::registry::{self, Capabilities, CAPABILITY_NAME};
//!
//! let mut host = Capabilities::new();
//! assert!(registry::install(&mut host));
//! assert!(!registry::install(&mut host));
//! assert!(host.get(CAPABILITY_NAME).is_some());
//! ```

// ============================================================================
// Imports
// ============================================================================

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::error::Result;
use crate::session::Session;

// ============================================================================
// Constants
// ============================================================================

/// Name the session constructor is registered under.
pub const CAPABILITY_NAME: &str = "WebTransport";

// ============================================================================
// Types
// ============================================================================

/// Constructor registered for [`CAPABILITY_NAME`].
pub type SessionConstructor = fn(&str) -> Result<Session>;

// ============================================================================
// Namespace
// ============================================================================

/// A host namespace that constructors can be registered in.
pub trait Namespace {
    /// Returns `true` if `name` is already defined.
    fn has(&self, name: &str) -> bool;

    /// Defines `name`.
    fn define(&mut self, name: &str, constructor: SessionConstructor);
}

/// Registers [`Session::new`] under [`CAPABILITY_NAME`] unless the host
/// already defines it.
///
/// Returns `true` if the constructor was installed.
pub fn install<N: Namespace + ?Sized>(namespace: &mut N) -> bool {
    if namespace.has(CAPABILITY_NAME) {
        debug!(name = CAPABILITY_NAME, "Native capability present, not installing");
        return false;
    }

    namespace.define(CAPABILITY_NAME, Session::new);
    debug!(name = CAPABILITY_NAME, "Capability installed");
    true
}

// ============================================================================
// Capabilities
// ============================================================================

/// Map-backed [`Namespace`].
#[derive(Debug, Default, Clone)]
pub struct Capabilities {
    constructors: FxHashMap<String, SessionConstructor>,
}

impl Capabilities {
    /// Creates an empty namespace.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the constructor registered under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SessionConstructor> {
        self.constructors.get(name).copied()
    }
}

impl Namespace for Capabilities {
    fn has(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    fn define(&mut self, name: &str, constructor: SessionConstructor) {
        self.constructors.insert(name.to_string(), constructor);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::{Error, SyntaxError};

    fn native(_url: &str) -> Result<Session> {
        Err(Error::unsupported("native"))
    }

    #[test]
    fn test_install_into_empty_namespace() {
        let mut host = Capabilities::new();
        assert!(install(&mut host));
        assert!(host.has(CAPABILITY_NAME));
    }

    #[test]
    fn test_existing_capability_kept() {
        let mut host = Capabilities::new();
        host.define(CAPABILITY_NAME, native);

        assert!(!install(&mut host));

        let constructor = host.get(CAPABILITY_NAME).expect("registered");
        assert!(matches!(constructor("https://a.test"), Err(Error::Unsupported { .. })));
    }

    #[test]
    fn test_installed_constructor_validates() {
        let mut host = Capabilities::new();
        install(&mut host);

        let constructor = host.get(CAPABILITY_NAME).expect("registered");
        assert!(matches!(
            constructor("ftp://a.test"),
            Err(Error::Syntax(SyntaxError::InvalidProtocol))
        ));
    }
}
